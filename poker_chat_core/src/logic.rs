use crate::card::{HandEvaluator, StandardEvaluator};
use crate::error::{TableError, TableResult};
use crate::state::*;
use rand::Rng;
use tracing::{debug, info};

// --- 核心游戏流程函数 ---

impl Table {
    /// 洗牌并给每个就座的玩家发两张底牌
    pub fn start_hand(&mut self) -> TableResult<()> {
        self.deck.shuffle();
        self.deal_hole_cards()
    }

    /// 同 `start_hand`，但使用给定的随机源洗牌
    pub fn start_hand_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TableResult<()> {
        self.deck.shuffle_with(rng);
        self.deal_hole_cards()
    }

    /// 从小盲注开始，一次一张、两轮发完底牌。未就座的位置不发牌。
    ///
    /// 任何就座玩家手里已有牌时拒绝重复发牌；牌不够时一张都不发。
    pub fn deal_hole_cards(&mut self) -> TableResult<()> {
        let n = self.players.len();
        let order: Vec<usize> = (0..n)
            .map(|step| (self.small_blind + step) % n)
            .filter(|&seat| self.players[seat].is_active)
            .collect();

        if let Some(&seat) = order.iter().find(|&&seat| !self.players[seat].hand.is_empty()) {
            return Err(TableError::AlreadyDealt(seat));
        }
        if self.deck.len() < order.len() * 2 {
            return Err(TableError::EmptyDeck);
        }

        for _ in 0..2 {
            for &seat in &order {
                let card = self.deck.draw()?;
                self.players[seat].hand.push(card);
            }
        }
        debug!(table = %self.id, seats = order.len(), "底牌已发出");
        Ok(())
    }

    /// 加注到 `amount` (本轮总下注额)，必须高于当前最高下注
    pub fn raise(&mut self, player_id: &str, amount: Chips) -> TableResult<()> {
        let seat = self.check_turn(player_id)?;
        if amount <= self.current_bet {
            return Err(TableError::InvalidAction(format!(
                "加注额 {} 必须高于当前下注 {}",
                amount, self.current_bet
            )));
        }
        self.wager(seat, amount)
    }

    /// 本轮首次下注，要求桌上还没有人下注
    pub fn bet(&mut self, player_id: &str, amount: Chips) -> TableResult<()> {
        let seat = self.check_turn(player_id)?;
        if self.current_bet > 0 {
            return Err(TableError::InvalidAction(format!(
                "本轮已有下注 {}，请使用加注",
                self.current_bet
            )));
        }
        if amount == 0 {
            return Err(TableError::InvalidAction("下注额必须大于 0".to_string()));
        }
        self.wager(seat, amount)
    }

    /// 跟注：补齐到当前最高下注 (发牌阶段为盲注)
    pub fn call(&mut self, player_id: &str) -> TableResult<()> {
        let seat = self.check_turn(player_id)?;
        let owed = self.amount_to_call(seat);
        self.ensure_affordable(seat, owed)?;
        self.commit_chips(seat, owed);
        self.players[seat].has_acted = true;
        self.progress()
    }

    /// 过牌：只有无需补齐时才允许
    pub fn check(&mut self, player_id: &str) -> TableResult<()> {
        let seat = self.check_turn(player_id)?;
        let owed = self.amount_to_call(seat);
        if owed > 0 {
            return Err(TableError::InvalidAction(format!("需要跟注 {}，不能过牌", owed)));
        }
        self.players[seat].has_acted = true;
        self.progress()
    }

    /// 弃牌：仍在座位上，但不再参与本局
    pub fn fold(&mut self, player_id: &str) -> TableResult<()> {
        let seat = self.check_turn(player_id)?;
        let player = &mut self.players[seat];
        player.folded = true;
        player.has_acted = true;
        self.progress()
    }

    /// 玩家离开牌桌：本局视为弃牌，座位不再参与后续牌局，已下注的筹码留在底池。
    ///
    /// 轮到他行动时行动权交给下一位；只剩一个未弃牌的座位时直接结算。
    pub fn leave(&mut self, player_id: &str) -> TableResult<()> {
        let seat = self
            .seat_of(player_id)
            .ok_or_else(|| TableError::InvalidAction(format!("{} 不在牌桌上", player_id)))?;
        let player = &mut self.players[seat];
        player.is_active = false;
        player.folded = true;
        player.has_acted = true;
        debug!(table = %self.id, seat, "玩家离桌");

        if self.is_hand_over() {
            return Ok(());
        }
        if seat == self.current_player || self.live_seats().len() < 2 || self.all_players_acted() {
            return self.progress();
        }
        Ok(())
    }

    /// 每个动作之后调用一次的推进步骤。
    ///
    /// - 只剩一个未弃牌的座位时，他直接赢得底池，不比牌。
    /// - 还有人没行动时，把行动权交给下一位。
    /// - 所有人都行动过时进入下一阶段并翻开公共牌；河牌圈结束后进入摊牌并结算。
    pub fn progress(&mut self) -> TableResult<()> {
        if self.is_hand_over() {
            return Ok(());
        }

        let live = self.live_seats();
        match live.as_slice() {
            [] => return Err(TableError::NoEligiblePlayers),
            [sole] => {
                self.award_uncontested(*sole);
                return Ok(());
            }
            _ => {}
        }

        if self.stage == Stage::Showdown {
            self.resolve_showdown();
            return Ok(());
        }

        if !self.all_players_acted() {
            self.current_player = self.next_active_not_folded_position(self.current_player)?;
            return Ok(());
        }

        let Some((next_stage, reveal)) = self.stage.next() else {
            return Ok(());
        };
        let cards = self.deck.draw_n(reveal)?;
        self.community_cards.extend(cards);
        self.stage = next_stage;
        info!(table = %self.id, stage = ?self.stage, pot = self.pot, "进入下一阶段");

        if self.stage == Stage::Showdown {
            self.resolve_showdown();
            return Ok(());
        }

        self.current_player = self.next_active_not_folded_position(self.big_blind)?;
        self.reset_player_actions();
        Ok(())
    }

    /// 摊牌：在所有未弃牌的座位中找出牌力数值最小的一个或多个赢家
    pub fn determine_winners(&mut self) -> Vec<usize> {
        self.determine_winners_with(&StandardEvaluator)
    }

    pub fn determine_winners_with(&mut self, evaluator: &dyn HandEvaluator) -> Vec<usize> {
        let mut best_rank = u32::MAX;
        let mut winners = Vec::new();

        for (seat, player) in self.players.iter().enumerate() {
            if !player.is_live() {
                continue;
            }
            let mut cards = player.hand.clone();
            cards.extend_from_slice(&self.community_cards);
            let rank = evaluator.rank(&cards);

            if rank < best_rank {
                best_rank = rank;
                winners = vec![seat];
            } else if rank == best_rank {
                winners.push(seat);
            }
        }

        self.winners = winners.clone();
        winners
    }

    /// 把底池平分给赢家。除不尽的零头从庄家左手边最近的赢家开始每人补 1 个筹码，
    /// 因此分出的总额始终等于底池。
    pub fn distribute_pot(&mut self) -> Vec<(usize, Chips)> {
        if self.winners.is_empty() {
            return Vec::new();
        }

        let n = self.players.len();
        let dealer = self.dealer_position;
        let mut order = self.winners.clone();
        order.sort_by_key(|&seat| (seat + n - dealer - 1) % n);

        let count = order.len() as Chips;
        let share = self.pot / count;
        let remainder = self.pot % count;

        let payouts: Vec<(usize, Chips)> = order
            .into_iter()
            .enumerate()
            .map(|(i, seat)| (seat, share + if (i as Chips) < remainder { 1 } else { 0 }))
            .collect();

        for &(seat, amount) in &payouts {
            self.players[seat].chips += amount;
        }
        self.pot = 0;
        self.payouts = payouts.clone();
        payouts
    }

    /// 一局结束后重置：清空牌堆、公共牌和底池，回到发牌阶段，重新洗牌并发牌
    pub fn reset_round(&mut self) -> TableResult<()> {
        self.clear_round();
        self.start_hand()
    }

    pub fn reset_round_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TableResult<()> {
        self.clear_round();
        self.start_hand_with(rng)
    }

    /// 庄家按钮移到下一个就座的位置，重新确定大小盲注，然后开始新的一局
    pub fn rotate_dealer(&mut self) -> TableResult<()> {
        self.advance_button()?;
        self.reset_round()
    }

    pub fn rotate_dealer_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> TableResult<()> {
        self.advance_button()?;
        self.reset_round_with(rng)
    }
}

// --- 辅助逻辑函数 ---

impl Table {
    /// 校验当前轮到 `player_id` 行动，返回其座位
    fn check_turn(&self, player_id: &str) -> TableResult<usize> {
        if self.is_hand_over() {
            return Err(TableError::InvalidAction("本局已经结束".to_string()));
        }
        let seat = self.current_player;
        let player = self.players.get(seat).ok_or(TableError::InvalidSeat(seat))?;
        if player.id != player_id {
            return Err(TableError::InvalidAction(format!("现在轮到 {} 行动", player.nickname)));
        }
        if !player.is_active {
            return Err(TableError::InvalidAction(format!("{} 没有参与本局", player.nickname)));
        }
        if player.folded {
            return Err(TableError::InvalidAction(format!("{} 已经弃牌", player.nickname)));
        }
        Ok(seat)
    }

    fn ensure_affordable(&self, seat: usize, amount: Chips) -> TableResult<()> {
        let player = &self.players[seat];
        if amount > player.chips {
            return Err(TableError::InvalidAction(format!(
                "{} 的筹码不足: 需要 {}，只有 {}",
                player.nickname, amount, player.chips
            )));
        }
        Ok(())
    }

    /// 从座位的筹码中扣除并放入底池
    fn commit_chips(&mut self, seat: usize, amount: Chips) {
        let player = &mut self.players[seat];
        player.chips -= amount;
        player.bet += amount;
        self.pot += amount;
    }

    /// 下注或加注到 `amount`。当前最高下注被抬高时，其他未弃牌的座位都需要重新表态。
    ///
    /// 发牌阶段只收盲注，`current_bet` 在该阶段始终为 0。
    fn wager(&mut self, seat: usize, amount: Chips) -> TableResult<()> {
        if self.stage == Stage::Draw {
            return Err(TableError::InvalidAction("发牌阶段只能跟注 (缴纳盲注) 或弃牌".to_string()));
        }
        let owed = self.amount_to_call(seat);
        let increment = amount.saturating_sub(self.players[seat].bet);
        if increment < owed {
            return Err(TableError::InvalidAction(format!("下注额至少要补齐 {}", owed)));
        }
        self.ensure_affordable(seat, increment)?;

        if amount > self.current_bet {
            self.current_bet = amount;
            for (idx, player) in self.players.iter_mut().enumerate() {
                if idx != seat && player.is_live() {
                    player.has_acted = false;
                }
            }
        }
        self.commit_chips(seat, increment);
        self.players[seat].has_acted = true;
        self.progress()
    }

    /// 新一轮下注开始前清空所有座位的行动标记和下注额
    fn reset_player_actions(&mut self) {
        for player in &mut self.players {
            player.has_acted = false;
            player.bet = 0;
        }
        self.current_bet = 0;
    }

    /// 只剩一人未弃牌：直接获胜，不需要比牌
    fn award_uncontested(&mut self, seat: usize) {
        self.stage = Stage::Showdown;
        self.winners = vec![seat];
        let payouts = self.distribute_pot();
        info!(table = %self.id, seat, ?payouts, "其他玩家均已弃牌");
    }

    fn resolve_showdown(&mut self) {
        let winners = self.determine_winners();
        let payouts = self.distribute_pot();
        info!(table = %self.id, ?winners, ?payouts, "摊牌结算完成");
    }

    fn clear_round(&mut self) {
        self.deck.clear();
        self.community_cards.clear();
        self.pot = 0;
        self.current_bet = 0;
        self.stage = Stage::Draw;
        self.winners.clear();
        self.payouts.clear();
        for player in &mut self.players {
            player.hand.clear();
            player.bet = 0;
            player.folded = false;
            player.has_acted = false;
        }
        self.current_player = self.small_blind;
    }

    fn advance_button(&mut self) -> TableResult<()> {
        self.dealer_position = self.next_active_position(self.dealer_position)?;
        self.small_blind = self.next_active_position(self.dealer_position)?;
        self.big_blind = self.next_active_position(self.small_blind)?;
        debug!(table = %self.id, dealer = self.dealer_position, "庄家按钮已轮转");
        Ok(())
    }
}

// --- 单元测试 ---
