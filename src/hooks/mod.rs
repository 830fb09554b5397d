pub mod backup_hook;
pub mod default_hook;
pub mod hook;

pub use backup_hook::BackupHook;
pub use default_hook::DefaultHook;
pub use hook::Hook;
