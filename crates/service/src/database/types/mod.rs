mod dtimestamp;

pub use dtimestamp::DTimestamp;
