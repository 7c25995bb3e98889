use std::net::SocketAddr;
use std::sync::{Arc, Weak};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use clap::Parser;
use dashmap::DashMap;
use futures_util::{stream::StreamExt, SinkExt};
use parking_lot::Mutex as P_Mutex;
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use poker_chat_core::{
    ChatCommand, Chips, ClientMessage, GroupId, Member, Outbound, PlayerId, ServerMessage, Session, TableConfig,
};

/// 机器人在群里发言时使用的昵称
const BOT_NICK: &str = "荷官";

#[derive(Parser, Debug)]
#[command(author, version, about = "群聊德州扑克服务器", long_about = None)]
struct Args {
    /// 监听地址
    #[arg(long, default_value = "0.0.0.0:25917")]
    addr: SocketAddr,
    #[arg(long, default_value_t = 5)]
    small_blind: Chips,
    #[arg(long, default_value_t = 10)]
    big_blind: Chips,
    /// 每个座位开局时的筹码
    #[arg(long, default_value_t = 1000)]
    buy_in: Chips,
}

// 服务器全局状态
struct AppState {
    groups: DashMap<GroupId, Arc<Group>>,
    config: TableConfig,
}

// 单个群聊的状态
// 重要‼️：严格规定使用锁的顺序，避免死锁：
// members -> session
struct Group {
    // 同一个群的所有牌桌命令都在这把锁下串行执行
    session: P_Mutex<Session>,
    // 按加入顺序排列的成员，也就是座位顺序
    members: RwLock<Vec<MemberConnection>>,
    // 会话产生的回复在 session 锁内入队，由 outbox 任务按入队顺序投递
    outbox: mpsc::UnboundedSender<Vec<Outbound>>,
}

impl Group {
    fn new(group_id: GroupId, config: TableConfig) -> Arc<Group> {
        Arc::new_cyclic(|weak| {
            let (outbox, rx) = mpsc::unbounded_channel();
            tokio::spawn(run_outbox(weak.clone(), rx));
            Group {
                session: P_Mutex::new(Session::new(group_id, config)),
                members: RwLock::new(Vec::new()),
                outbox,
            }
        })
    }

    /// 在 session 锁内执行 `f`，并在释放锁之前把结果排进 outbox
    fn with_session(&self, f: impl FnOnce(&mut Session) -> Vec<Outbound>) {
        let mut session = self.session.lock();
        let outbound = f(&mut session);
        if !outbound.is_empty() && self.outbox.send(outbound).is_err() {
            warn!("群的 outbox 已关闭，回复被丢弃");
        }
    }
}

// 成员的网络连接信息
struct MemberConnection {
    member: Member,
    // 用于向该成员的 WebSocket 任务发送消息的通道
    sender: mpsc::Sender<ServerMessage>,
}

type SharedState = Arc<AppState>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if args.big_blind < args.small_blind {
        return Err(format!("大盲注 {} 不能小于小盲注 {}", args.big_blind, args.small_blind).into());
    }

    let state = SharedState::new(AppState {
        groups: DashMap::new(),
        config: TableConfig {
            small_blind: args.small_blind,
            big_blind: args.big_blind,
            buy_in: args.buy_in,
        },
    });

    let app = Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(state);

    info!("服务器正在监听 {}", args.addr);
    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// 处理 WebSocket 连接请求
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// 处理单个 WebSocket 连接的生命周期
async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (mut sender, mut receiver) = socket.split();

    // 创建一个 MPSC 通道，用于从其他任务接收要发送的消息
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(32);

    // 启动一个新任务，专门负责将 MPSC 通道中的消息发送到 WebSocket
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let payload = match serde_json::to_string(&msg) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("序列化消息失败: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                // 发送失败，说明客户端已断开，退出任务
                break;
            }
        }
    });

    // 当前连接所在的群和成员身份，加入群聊后填充
    let mut context: Option<(GroupId, Member)> = None;

    // 主循环，处理从客户端接收到的消息
    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Text(text) = msg {
            match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(client_msg) => {
                    handle_client_message(client_msg, state.clone(), &tx, &mut context).await;
                }
                Err(e) => {
                    warn!("解析消息失败: {}", e);
                }
            }
        }
    }

    // 客户端断开连接，执行清理工作
    if let Some((group_id, member)) = context {
        handle_disconnect(state, group_id, member.id).await;
    }
    info!("客户端连接关闭");
}

/// 核心消息处理逻辑
async fn handle_client_message(
    msg: ClientMessage,
    state: SharedState,
    tx: &mpsc::Sender<ServerMessage>,
    context: &mut Option<(GroupId, Member)>,
) {
    match msg {
        ClientMessage::JoinGroup { group_id, nickname } => {
            if context.is_some() {
                let _ = tx.send(ServerMessage::Error { message: "你已经在一个群里了".to_string() }).await;
                return;
            }

            let group = state
                .groups
                .entry(group_id.clone())
                .or_insert_with(|| Group::new(group_id.clone(), state.config))
                .clone();

            let member = Member { id: Uuid::new_v4().to_string(), nickname };
            let members = {  // members write lock
                let mut members = group.members.write().await;
                members.push(MemberConnection { member: member.clone(), sender: tx.clone() });
                members.iter().map(|c| c.member.clone()).collect::<Vec<_>>()
            };

            info!("成员 {} ({}) 加入了群 {}", member.nickname, member.id, group_id);
            *context = Some((group_id.clone(), member.clone()));
            {  // members read lock
                // 通知群里其他成员
                let join_msg = ServerMessage::MemberJoined { member: member.clone() };
                broadcast(group.members.read().await.iter(), &join_msg, Some(&member.id)).await;
            }
            let _ = tx.send(ServerMessage::Joined {
                your_id: member.id,
                group_id,
                members,
            }).await;
        }
        ClientMessage::LeaveGroup => {
            if let Some((group_id, member)) = context.take() {
                handle_disconnect(state, group_id, member.id).await;
            }
        }
        ClientMessage::Say(text) => {
            let Some((group_id, member)) = context.as_ref() else {
                let _ = tx.send(ServerMessage::Error { message: "请先加入一个群".to_string() }).await;
                return;
            };
            let group = match state.groups.get(group_id) {
                None => {
                    let _ = tx.send(ServerMessage::Error { message: "群不存在".to_string() }).await;
                    return;
                }
                Some(g) => g.clone(),
            };

            // 先把原话转发给群里其他人
            let chat = ServerMessage::GroupMessage { from: member.nickname.clone(), text: text.clone() };
            broadcast(group.members.read().await.iter(), &chat, Some(&member.id)).await;

            let command = match ChatCommand::parse(&text) {
                None => return,
                Some(Err(usage)) => {
                    let _ = tx.send(ServerMessage::Error { message: usage }).await;
                    return;
                }
                Some(Ok(command)) => command,
            };

            // 持有 members 读锁，保证命令执行期间名单不变
            let members = group.members.read().await;
            let roster: Vec<Member> = members.iter().map(|c| c.member.clone()).collect();
            group.with_session(|session| session.handle(member, command, &roster));
        }
    }
}

/// 每个群一个投递任务：按会话产生的顺序把回复送出去。群被释放后任务退出。
async fn run_outbox(group: Weak<Group>, mut rx: mpsc::UnboundedReceiver<Vec<Outbound>>) {
    while let Some(outbound) = rx.recv().await {
        let Some(group) = group.upgrade() else { break };
        let members = group.members.read().await;
        deliver(&members, outbound).await;
    }
}

/// 把会话产生的回复送出去。发送失败只记录日志，牌桌状态不回滚。
async fn deliver(members: &[MemberConnection], outbound: Vec<Outbound>) {
    for out in outbound {
        match out {
            Outbound::Group(text) => {
                let msg = ServerMessage::GroupMessage { from: BOT_NICK.to_string(), text };
                broadcast(members.iter(), &msg, None).await;
            }
            Outbound::Private { to, text } => {
                let Some(conn) = members.iter().find(|c| c.member.id == to) else {
                    warn!("私信对象 {} 不在群里", to);
                    continue;
                };
                let msg = ServerMessage::PrivateMessage { from: BOT_NICK.to_string(), text };
                if conn.sender.send(msg).await.is_err() {
                    warn!("向成员 {} 发送私信失败（可能已断开）", to);
                }
            }
        }
    }
}

/// 成员断开连接或离开群后的处理
async fn handle_disconnect(state: SharedState, group_id: GroupId, member_id: PlayerId) {
    info!("成员 {} 离开了群 {}", member_id, group_id);
    let group = match state.groups.get(&group_id) {
        None => return,
        Some(g) => g.clone(),
    };

    let now_empty = {  // members write lock
        let mut members = group.members.write().await;
        members.retain(|c| c.member.id != member_id);

        let left_msg = ServerMessage::MemberLeft { member_id: member_id.clone() };
        broadcast(members.iter(), &left_msg, None).await;
        // 离开的成员如果在牌桌上，由会话替他弃牌，牌局继续
        group.with_session(|session| session.member_left(&member_id));
        members.is_empty()
    };

    // 判断是否清空群
    if now_empty {
        state.groups.remove(&group_id);
        info!("群 {} 已空，已被移除", group_id);
    }
}

/// 向群内所有成员广播消息
async fn broadcast<'a>(
    members: impl Iterator<Item = &'a MemberConnection>,
    message: &ServerMessage,
    exclude: Option<&PlayerId>,
) {
    for conn in members {
        if Some(&conn.member.id) == exclude {
            continue;
        }
        if conn.sender.send(message.clone()).await.is_err() {
            // 发送失败，说明该成员也断开了，后续由其自己的 handle_socket 任务处理
            warn!("向成员 {} 发送消息失败（可能已断开）", conn.member.id);
        }
    }
}
