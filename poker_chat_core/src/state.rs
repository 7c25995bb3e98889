use crate::card::Card;
use crate::deck::Deck;
use crate::error::{TableError, TableResult};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type GroupId = String;
pub type PlayerId = String;
pub type Chips = u64;

/// 开局所需的最少就座玩家数
pub const MIN_PLAYERS: usize = 3;

/// 开新牌桌时使用的盲注和初始筹码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    pub small_blind: Chips,
    pub big_blind: Chips,
    pub buy_in: Chips,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig { small_blind: 5, big_blind: 10, buy_in: 1000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub nickname: String,
    pub hand: Vec<Card>,  // 0 张，或发牌后恰好 2 张
    pub chips: Chips,     // 剩余筹码
    pub bet: Chips,       // 本轮已下注额
    pub is_active: bool,  // 就座并参与本局
    pub folded: bool,     // 本局已弃牌，但仍在座位上
    pub has_acted: bool,  // 自上次重置以来是否已行动
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, nickname: impl Into<String>, chips: Chips) -> Player {
        Player {
            id: id.into(),
            nickname: nickname.into(),
            hand: Vec::new(),
            chips,
            bet: 0,
            is_active: true,
            folded: false,
            has_acted: false,
        }
    }

    /// 坐在桌边但不参与牌局的座位 (例如机器人自己)
    pub fn sitting_out(id: impl Into<PlayerId>, nickname: impl Into<String>) -> Player {
        Player { is_active: false, ..Player::new(id, nickname, 0) }
    }

    /// 仍在争夺底池：就座且未弃牌
    pub fn is_live(&self) -> bool {
        self.is_active && !self.folded
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Stage {
    Draw,
    PreFlop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Stage {
    /// 该阶段桌面上应有的公共牌数量
    pub fn community_card_count(self) -> usize {
        match self {
            Stage::Draw | Stage::PreFlop => 0,
            Stage::Flop => 3,
            Stage::Turn => 4,
            Stage::River | Stage::Showdown => 5,
        }
    }

    /// 下一阶段，以及进入该阶段时要翻开的公共牌数
    pub fn next(self) -> Option<(Stage, usize)> {
        match self {
            Stage::Draw => Some((Stage::PreFlop, 0)),
            Stage::PreFlop => Some((Stage::Flop, 3)),
            Stage::Flop => Some((Stage::Turn, 1)),
            Stage::Turn => Some((Stage::River, 1)),
            Stage::River => Some((Stage::Showdown, 0)),
            Stage::Showdown => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            Stage::Draw => "发牌",
            Stage::PreFlop => "翻牌前",
            Stage::Flop => "翻牌",
            Stage::Turn => "转牌",
            Stage::River => "河牌",
            Stage::Showdown => "摊牌",
        })
    }
}

/// 一张牌桌 (对应一个群聊)。座位顺序决定庄家和盲注的轮转。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub id: GroupId,
    pub players: Vec<Player>,
    pub community_cards: Vec<Card>,
    pub stage: Stage,
    pub current_player: usize,
    pub current_bet: Chips, // 本轮下注的最高金额
    pub pot: Chips,         // 总奖池金额
    pub dealer_position: usize,
    pub small_blind: usize, // 小盲注座位
    pub big_blind: usize,   // 大盲注座位
    pub small_blind_size: Chips,
    pub big_blind_size: Chips,
    // 服务端持有的牌堆，不对外展示
    #[serde(skip)]
    pub deck: Deck,
    // 赢家座位，只在摊牌结算后才有内容
    pub winners: Vec<usize>,
    // 结算时每个赢家分到的筹码 (座位, 金额)
    pub payouts: Vec<(usize, Chips)>,
}

impl Table {
    /// 创建一张新牌桌，停在发牌阶段，由小盲注先行动。
    /// 此时还没有洗牌和发牌，见 `start_hand`。
    pub fn new(
        id: impl Into<GroupId>,
        players: Vec<Player>,
        dealer_position: usize,
        small_blind_size: Chips,
        big_blind_size: Chips,
    ) -> TableResult<Table> {
        if dealer_position >= players.len() {
            return Err(TableError::InvalidSeat(dealer_position));
        }
        let active = players.iter().filter(|p| p.is_active).count();
        if active < MIN_PLAYERS {
            return Err(TableError::InsufficientPlayers { required: MIN_PLAYERS, found: active });
        }

        let mut table = Table {
            id: id.into(),
            players,
            community_cards: Vec::with_capacity(5),
            stage: Stage::Draw,
            current_player: 0,
            current_bet: 0,
            pot: 0,
            dealer_position,
            small_blind: 0,
            big_blind: 0,
            small_blind_size,
            big_blind_size,
            deck: Deck::default(),
            winners: Vec::new(),
            payouts: Vec::new(),
        };
        table.small_blind = table.next_active_position(dealer_position)?;
        table.big_blind = table.next_active_position(table.small_blind)?;
        // 发牌阶段按发牌顺序而不是下注顺序，所以从小盲注开始
        table.current_player = table.small_blind;
        Ok(table)
    }

    /// 下一个就座的位置 (循环)，不考虑是否弃牌
    pub fn next_active_position(&self, pos: usize) -> TableResult<usize> {
        self.next_position_where(pos, |p| p.is_active)
    }

    /// 下一个就座且未弃牌的位置 (循环)
    pub fn next_active_not_folded_position(&self, pos: usize) -> TableResult<usize> {
        self.next_position_where(pos, Player::is_live)
    }

    fn next_position_where(&self, pos: usize, eligible: impl Fn(&Player) -> bool) -> TableResult<usize> {
        let n = self.players.len();
        (1..=n)
            .map(|step| (pos + step) % n)
            .find(|&idx| eligible(&self.players[idx]))
            .ok_or(TableError::NoEligiblePlayers)
    }

    pub fn current(&self) -> Option<&Player> {
        self.players.get(self.current_player)
    }

    pub fn seat_of(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    /// 仍在争夺底池的座位
    pub fn live_seats(&self) -> Vec<usize> {
        self.players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_live())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// 所有就座且未弃牌的玩家是否都已行动
    pub fn all_players_acted(&self) -> bool {
        self.players.iter().filter(|p| p.is_live()).all(|p| p.has_acted)
    }

    /// 本局是否已经结算完毕
    pub fn is_hand_over(&self) -> bool {
        self.stage == Stage::Showdown && !self.winners.is_empty()
    }

    /// 指定座位跟注需要补齐的金额。
    /// 发牌阶段大小盲注通过跟注缴纳盲注，其他座位无需补齐。
    pub fn amount_to_call(&self, seat: usize) -> Chips {
        let Some(player) = self.players.get(seat) else { return 0 };
        if self.stage == Stage::Draw {
            let blind = if seat == self.small_blind {
                self.small_blind_size
            } else if seat == self.big_blind {
                self.big_blind_size
            } else {
                0
            };
            return blind.saturating_sub(player.bet);
        }
        self.current_bet.saturating_sub(player.bet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seats(n: usize) -> Vec<Player> {
        (0..n).map(|i| Player::new(format!("p{i}"), format!("Player_{i}"), 1000)).collect()
    }

    #[test]
    fn test_new_table_assigns_blinds_by_rotation() {
        let table = Table::new("g", seats(3), 0, 5, 10).unwrap();
        assert_eq!(table.small_blind, 1);
        assert_eq!(table.big_blind, 2);
        assert_eq!(table.current_player, 1);
        assert_eq!(table.stage, Stage::Draw);
        assert_eq!(table.pot, 0);
    }

    #[test]
    fn test_new_table_skips_inactive_seats() {
        let mut players = seats(5);
        players[1].is_active = false;
        players[3].is_active = false;
        let table = Table::new("g", players, 4, 5, 10).unwrap();
        assert_eq!(table.small_blind, 0);
        assert_eq!(table.big_blind, 2);
    }

    #[test]
    fn test_new_table_ignores_folded_for_blinds() {
        let mut players = seats(3);
        players[1].folded = true;
        let table = Table::new("g", players, 0, 5, 10).unwrap();
        assert_eq!(table.small_blind, 1);
    }

    #[test]
    fn test_new_table_requires_three_active_seats() {
        let mut players = seats(3);
        players[0] = Player::sitting_out("bot", "bot");
        assert_eq!(
            Table::new("g", players, 0, 5, 10).unwrap_err(),
            TableError::InsufficientPlayers { required: 3, found: 2 }
        );
    }

    #[test]
    fn test_new_table_rejects_dealer_outside_table() {
        assert_eq!(Table::new("g", seats(3), 3, 5, 10).unwrap_err(), TableError::InvalidSeat(3));
    }

    #[test]
    fn test_rotation_never_selects_ineligible_seats() {
        let mut table = Table::new("g", seats(6), 0, 5, 10).unwrap();
        table.players[2].is_active = false;
        table.players[4].folded = true;
        table.players[5].is_active = false;
        for start in 0..6 {
            let next = table.next_active_position(start).unwrap();
            assert!(table.players[next].is_active);
            assert_ne!(next, start);

            let live = table.next_active_not_folded_position(start).unwrap();
            assert!(table.players[live].is_live());
        }
        assert_eq!(table.next_active_position(3).unwrap(), 4);
        assert_eq!(table.next_active_not_folded_position(3).unwrap(), 0);
    }

    #[test]
    fn test_rotation_wraps_back_to_the_only_qualifying_seat() {
        let mut table = Table::new("g", seats(3), 0, 5, 10).unwrap();
        table.players[0].folded = true;
        table.players[2].folded = true;
        assert_eq!(table.next_active_not_folded_position(1).unwrap(), 1);
    }

    #[test]
    fn test_rotation_without_eligible_seat_is_an_error() {
        let mut table = Table::new("g", seats(3), 0, 5, 10).unwrap();
        for p in &mut table.players {
            p.folded = true;
        }
        assert_eq!(table.next_active_not_folded_position(0), Err(TableError::NoEligiblePlayers));
        for p in &mut table.players {
            p.is_active = false;
        }
        assert_eq!(table.next_active_position(0), Err(TableError::NoEligiblePlayers));
    }

    #[test]
    fn test_stage_card_counts() {
        let mut stage = Stage::Draw;
        let mut revealed = 0;
        while let Some((next, reveal)) = stage.next() {
            revealed += reveal;
            stage = next;
            assert_eq!(stage.community_card_count(), revealed);
        }
        assert_eq!(stage, Stage::Showdown);
    }

    #[test]
    fn test_amount_to_call_collects_blinds_during_draw() {
        let table = Table::new("g", seats(3), 0, 5, 10).unwrap();
        assert_eq!(table.amount_to_call(1), 5);
        assert_eq!(table.amount_to_call(2), 10);
        assert_eq!(table.amount_to_call(0), 0);
    }
}
