use crate::card::format_cards;
use crate::error::TableError;
use crate::message::{ChatCommand, Member, render_table};
use crate::state::{GroupId, MIN_PLAYERS, Player, PlayerId, Table, TableConfig};
use tracing::{info, warn};

/// 处理完一条命令后需要发出去的消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// 发到群里
    Group(String),
    /// 私信给某个成员
    Private { to: PlayerId, text: String },
}

/// 一个群聊的牌局会话。调用方需要保证同一个群的命令串行执行。
#[derive(Debug, Clone)]
pub struct Session {
    group_id: GroupId,
    config: TableConfig,
    table: Option<Table>,
}

impl Session {
    pub fn new(group_id: impl Into<GroupId>, config: TableConfig) -> Session {
        Session { group_id: group_id.into(), config, table: None }
    }

    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    /// 执行一条命令。`roster` 是当前群成员名单，顺序即座位顺序。
    pub fn handle(&mut self, sender: &Member, command: ChatCommand, roster: &[Member]) -> Vec<Outbound> {
        match command {
            ChatCommand::Start => self.start(roster),
            ChatCommand::Next => self.next_hand(),
            ChatCommand::Status => match &self.table {
                Some(table) => vec![Outbound::Group(render_table(table))],
                None => vec![Outbound::Group("当前没有进行中的牌局，输入 !start 开始".to_string())],
            },
            ChatCommand::Hand => self.show_hand(sender),
            ChatCommand::Call
            | ChatCommand::Check
            | ChatCommand::Bet(_)
            | ChatCommand::Raise(_)
            | ChatCommand::Fold => self.act(sender, command),
        }
    }

    /// 成员离开群：如果他在牌桌上，本局替他弃牌，之后的牌局不再给他发牌
    pub fn member_left(&mut self, member_id: &str) -> Vec<Outbound> {
        let Some(table) = self.table.as_mut() else { return Vec::new() };
        let Some(seat) = table.seat_of(member_id) else { return Vec::new() };
        if !table.players[seat].is_active {
            return Vec::new();
        }

        let nickname = table.players[seat].nickname.clone();
        let was_over = table.is_hand_over();
        match table.leave(member_id) {
            Ok(()) if was_over => vec![Outbound::Group(format!("{} 离开了牌桌", nickname))],
            Ok(()) => vec![Outbound::Group(format!("{} 离开了牌桌，本局视为弃牌{}", nickname, render_table(table)))],
            Err(e) => self.fail(e),
        }
    }

    fn start(&mut self, roster: &[Member]) -> Vec<Outbound> {
        if self.table.as_ref().is_some_and(|t| !t.is_hand_over()) {
            return vec![Outbound::Group("已有牌局在进行中".to_string())];
        }
        if roster.len() < MIN_PLAYERS {
            return vec![Outbound::Group(format!(
                "至少需要 {} 名玩家才能开始，当前只有 {} 人",
                MIN_PLAYERS,
                roster.len()
            ))];
        }

        let players = roster
            .iter()
            .map(|m| Player::new(m.id.clone(), m.nickname.clone(), self.config.buy_in))
            .collect();
        let result = Table::new(
            self.group_id.clone(),
            players,
            0,
            self.config.small_blind,
            self.config.big_blind,
        )
        .and_then(|mut table| table.start_hand().map(|_| table));

        match result {
            Ok(table) => {
                info!(group = %self.group_id, seats = table.players.len(), "新牌局开始");
                let messages = deal_messages(&table);
                self.table = Some(table);
                messages
            }
            Err(e) => self.fail(e),
        }
    }

    fn next_hand(&mut self) -> Vec<Outbound> {
        let Some(table) = self.table.as_mut() else {
            return vec![Outbound::Group("当前没有牌局，输入 !start 开始".to_string())];
        };
        if !table.is_hand_over() {
            return vec![Outbound::Group("本局尚未结束".to_string())];
        }
        let seated = table.players.iter().filter(|p| p.is_active).count();
        if seated < MIN_PLAYERS {
            self.table = None;
            return vec![Outbound::Group(format!(
                "在座玩家只剩 {} 人，牌桌已解散，输入 !start 重新开始",
                seated
            ))];
        }
        match table.rotate_dealer() {
            Ok(()) => deal_messages(table),
            Err(e) => self.fail(e),
        }
    }

    fn show_hand(&self, sender: &Member) -> Vec<Outbound> {
        let text = match self.table.as_ref().and_then(|t| t.seat_of(&sender.id).map(|s| &t.players[s])) {
            Some(player) if !player.hand.is_empty() => format!("底牌: {}", format_cards(&player.hand)),
            _ => "你没有参与当前牌局".to_string(),
        };
        vec![Outbound::Private { to: sender.id.clone(), text }]
    }

    fn act(&mut self, sender: &Member, command: ChatCommand) -> Vec<Outbound> {
        let Some(table) = self.table.as_mut() else {
            return vec![Outbound::Group("当前没有牌局，输入 !start 开始".to_string())];
        };

        let id = sender.id.as_str();
        let (result, verb) = match command {
            ChatCommand::Call => (table.call(id), "跟注".to_string()),
            ChatCommand::Check => (table.check(id), "过牌".to_string()),
            ChatCommand::Fold => (table.fold(id), "弃牌".to_string()),
            ChatCommand::Bet(amount) => (table.bet(id, amount), format!("下注 {}", amount)),
            ChatCommand::Raise(amount) => (table.raise(id, amount), format!("加注到 {}", amount)),
            _ => return Vec::new(),
        };

        match result {
            Ok(()) => vec![Outbound::Group(format!("{} {}{}", sender.nickname, verb, render_table(table)))],
            Err(e) => self.fail_for(sender, e),
        }
    }

    /// 可恢复的错误只回复给群，致命错误丢弃整张牌桌
    fn fail_for(&mut self, sender: &Member, error: TableError) -> Vec<Outbound> {
        if error.is_fatal() {
            return self.fail(error);
        }
        vec![Outbound::Group(format!("{}: {}", sender.nickname, error))]
    }

    fn fail(&mut self, error: TableError) -> Vec<Outbound> {
        if !error.is_fatal() {
            return vec![Outbound::Group(error.to_string())];
        }
        warn!(group = %self.group_id, %error, "牌局中止");
        self.table = None;
        vec![Outbound::Group(format!("牌局出错已中止: {}。请输入 !start 重新开始", error))]
    }
}

/// 发牌后的消息：每位就座玩家私信底牌，群里公布牌局概况
fn deal_messages(table: &Table) -> Vec<Outbound> {
    let mut messages: Vec<Outbound> = table
        .players
        .iter()
        .filter(|p| p.is_active)
        .map(|p| Outbound::Private {
            to: p.id.clone(),
            text: format!("底牌: {}\n___________________________________", format_cards(&p.hand)),
        })
        .collect();
    messages.push(Outbound::Group(render_table(table)));
    messages
}
