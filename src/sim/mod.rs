/// Orchestration on top of the domain rules: puzzle bookkeeping, the
/// play-through session and the events it reports.

pub mod event;
pub mod manager;
pub mod session;
