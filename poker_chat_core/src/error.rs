use thiserror::Error;

/// 牌桌操作的错误。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("牌堆已空，本局需要手动重置")]
    EmptyDeck,

    #[error("没有可以轮转到的座位")]
    NoEligiblePlayers,

    #[error("非法操作: {0}")]
    InvalidAction(String),

    #[error("玩家不足: 至少需要 {required} 人，目前只有 {found} 人")]
    InsufficientPlayers { required: usize, found: usize },

    #[error("座位 {0} 不存在")]
    InvalidSeat(usize),

    #[error("座位 {0} 已经发过底牌")]
    AlreadyDealt(usize),
}

impl TableError {
    /// 致命错误意味着本局无法继续，调用方应丢弃牌桌。
    /// 其余错误只拒绝本次操作，牌桌状态保持不变。
    pub fn is_fatal(&self) -> bool {
        matches!(self, TableError::EmptyDeck | TableError::NoEligiblePlayers)
    }
}

pub type TableResult<T> = Result<T, TableError>;
