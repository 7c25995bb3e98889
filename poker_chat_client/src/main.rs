use futures_util::{SinkExt, StreamExt};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use poker_chat_core::{ClientMessage, ServerMessage};

const DEFAULT_URL: &str = "ws://127.0.0.1:25917/ws";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = Url::parse(&std::env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string()))?;

    println!("正在连接到: {}", url);
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    println!("连接成功!");

    let (mut write, mut read) = ws_stream.split();

    // 启动一个任务来处理从服务器接收的消息
    tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(text.as_str()) {
                    Ok(server_msg) => {
                        print_server_message(server_msg);
                        print!("> "); // 重新显示输入提示符
                        let _ = std::io::stdout().flush();
                    }
                    Err(e) => eprintln!("解析服务器消息失败: {}", e),
                },
                Ok(_) => {}
                Err(e) => {
                    eprintln!("接收消息时出错: {}", e);
                    break;
                }
            }
        }
    });

    // 主任务处理用户输入
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    println!("--- 群聊德州扑克客户端 ---");
    println!("可用命令:");
    println!("  /join <群ID> <昵称>   - 加入一个群");
    println!("  /leave                - 离开当前群");
    println!("  /quit                 - 退出");
    println!("其他输入都会作为群消息发送，牌桌命令:");
    println!("  !start !call !check !fold !bet <金额> !raise <金额> !status !hand !next");

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = stdin.next_line().await? else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();

        let client_msg = match parts[0] {
            "/join" => {
                if parts.len() < 3 {
                    println!("用法: /join <群ID> <昵称>");
                    continue;
                }
                ClientMessage::JoinGroup { group_id: parts[1].to_string(), nickname: parts[2].to_string() }
            }
            "/leave" => ClientMessage::LeaveGroup,
            "/quit" => {
                println!("正在断开连接...");
                break;
            }
            _ => ClientMessage::Say(line.to_string()),
        };

        let payload = serde_json::to_string(&client_msg)?;
        write.send(Message::Text(payload.into())).await?;
    }

    Ok(())
}

fn print_server_message(msg: ServerMessage) {
    match msg {
        ServerMessage::Joined { your_id, group_id, members } => {
            let names: Vec<&str> = members.iter().map(|m| m.nickname.as_str()).collect();
            println!("\n已加入群 {} (你的ID: {})，成员: {}", group_id, your_id, names.join(", "));
        }
        ServerMessage::MemberJoined { member } => println!("\n* {} 加入了群", member.nickname),
        ServerMessage::MemberLeft { member_id } => println!("\n* {} 离开了群", member_id),
        ServerMessage::GroupMessage { from, text } => println!("\n<{}> {}", from, text),
        ServerMessage::PrivateMessage { from, text } => println!("\n[私信 {}] {}", from, text),
        ServerMessage::Error { message } => println!("\n[错误] {}", message),
    }
}
