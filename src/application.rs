// アプリケーション層
// ユースケースの調整とエラー種別への変換を担当する

pub mod error;
pub mod service;

pub use error::{ApplicationError, ErrorKind};
