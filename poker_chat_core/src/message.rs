use crate::card::{find_best_hand, format_cards};
use crate::state::{Chips, GroupId, PlayerId, Stage, Table};
use serde::{Deserialize, Serialize};

/// 群成员 (名册中的一项)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: PlayerId,
    pub nickname: String,
}

// --- 客户端 -> 服务器 的消息 ---

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum ClientMessage {
    /// 加入一个群聊，不存在时自动创建
    JoinGroup { group_id: GroupId, nickname: String },
    /// 离开当前群聊
    LeaveGroup,
    /// 在群里发一条消息。以 `!` 开头的是牌桌命令
    Say(String),
}

// --- 服务器 -> 客户端 的消息 ---

#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum ServerMessage {
    /// 成功加入群聊后私密地发给该成员
    Joined {
        your_id: PlayerId,
        group_id: GroupId,
        members: Vec<Member>,
    },
    MemberJoined { member: Member },
    MemberLeft { member_id: PlayerId },
    /// 群消息，`from` 为发送者昵称
    GroupMessage { from: String, text: String },
    /// 只发给一个成员的私信 (例如底牌)
    PrivateMessage { from: String, text: String },
    Error { message: String },
}

/// 群聊里的牌桌命令
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand {
    Start,
    Call,
    Check,
    Bet(Chips),
    Raise(Chips),
    Fold,
    Status,
    Hand,
    Next,
}

impl ChatCommand {
    /// 解析一行群消息。普通聊天 (包括不认识的 `!` 命令) 返回 `None`，
    /// 命令参数有误时返回用法提示。
    pub fn parse(text: &str) -> Option<Result<ChatCommand, String>> {
        let mut parts = text.trim().split_whitespace();
        let command = parts.next()?.strip_prefix('!')?;

        let amount = |name: &str, arg: Option<&str>| match arg.map(str::parse::<Chips>) {
            Some(Ok(amount)) => Ok(amount),
            _ => Err(format!("用法: !{} <金额>", name)),
        };

        let parsed = match command.to_lowercase().as_str() {
            "start" => Ok(ChatCommand::Start),
            "call" => Ok(ChatCommand::Call),
            "check" => Ok(ChatCommand::Check),
            "fold" => Ok(ChatCommand::Fold),
            "status" => Ok(ChatCommand::Status),
            "hand" => Ok(ChatCommand::Hand),
            "next" => Ok(ChatCommand::Next),
            "bet" => amount("bet", parts.next()).map(ChatCommand::Bet),
            "raise" => amount("raise", parts.next()).map(ChatCommand::Raise),
            _ => return None,
        };
        Some(parsed)
    }
}

// --- 回复文本 ---

/// 牌局概况：阶段、公共牌、底池，以及轮到谁行动
pub fn render_table(table: &Table) -> String {
    let mut text = format!(
        "\n---------------\n当前阶段: {}\n公共牌: {}\n底池: {}\n---------------\n",
        table.stage,
        format_cards(&table.community_cards),
        table.pot,
    );

    if table.stage == Stage::Draw {
        let bb = &table.players[table.big_blind];
        let sb = &table.players[table.small_blind];
        let owed = |seat: usize| table.amount_to_call(seat);
        if owed(table.big_blind) > 0 || owed(table.small_blind) > 0 {
            text.push_str(&format!(
                "等待盲注:\n大盲 {} 来自 {}\n小盲 {} 来自 {}\n",
                table.big_blind_size, bb.nickname, table.small_blind_size, sb.nickname,
            ));
        }
    }

    if table.is_hand_over() {
        text.push_str(&render_showdown(table));
    } else if let Some(player) = table.current() {
        let owed = table.amount_to_call(table.current_player);
        if owed > 0 {
            text.push_str(&format!("当前行动: {} (需跟注 {})\n", player.nickname, owed));
        } else {
            text.push_str(&format!("当前行动: {}\n", player.nickname));
        }
    }
    text
}

/// 结算结果：赢家、牌型和分到的筹码
pub fn render_showdown(table: &Table) -> String {
    let mut text = String::from("本局结束\n");
    let contested = table.live_seats().len() > 1;

    if contested {
        for seat in table.live_seats() {
            let player = &table.players[seat];
            text.push_str(&format!("{} 的底牌: {}\n", player.nickname, format_cards(&player.hand)));
        }
    }

    for &(seat, amount) in &table.payouts {
        let player = &table.players[seat];
        let mut cards = player.hand.clone();
        cards.extend_from_slice(&table.community_cards);
        match find_best_hand(&cards) {
            Some(hand) if contested => {
                text.push_str(&format!("赢家: {} ({})，赢得 {}\n", player.nickname, hand, amount));
            }
            _ => text.push_str(&format!("赢家: {}，赢得 {}\n", player.nickname, amount)),
        }
    }
    text.push_str("输入 !next 开始下一局\n");
    text
}
