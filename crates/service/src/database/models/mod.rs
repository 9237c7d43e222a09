mod audit_log;
mod direct_share;
mod file;
mod public_share;

pub use audit_log::AuditLogEntry;
pub use direct_share::DirectShare;
pub use file::{FileAccess, FileRecord, OwnedFile};
pub use public_share::{PublicShare, PublicShareWithFile};
