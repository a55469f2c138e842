// ドメイン層
// 予約のビジネスルールと外部依存のポートを定義する

pub mod error;
pub mod model;
pub mod port;
pub mod service;
