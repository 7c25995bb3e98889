//! # 群聊德州扑克核心逻辑库
//!
//! 这个 `core` crate 包含一张牌桌的全部状态和规则：牌堆、牌力评估、
//! 阶段状态机、底池结算，以及群聊命令的解析和回复文本。
//! 它不做任何网络 I/O，消息的收发由上层的服务器负责，
//! 同一张牌桌的操作需要由调用方串行化。

mod card;
mod deck;
mod error;
mod logic;
mod message;
mod session;
mod state;

pub use card::*;

pub use deck::*;

pub use error::*;

pub use message::*;

pub use session::*;

pub use state::*;
