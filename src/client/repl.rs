// src/client/repl.rs
// Interactive terminal chat over stdin/stdout

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

use super::http::PersonaChatClient;
use super::session::{ChatSession, PersonaCard, PersonaSelection, RECOMMENDED_PERSONAS};

const HELP: &str = "\
コマンド:
  /recommend [n]   おすすめペルソナ一覧 / n 番を選択
  /random          ランダムなペルソナを選択
  /persona <n>     ペルソナ番号を直接指定 (0-999999)
  /info            現在のペルソナ情報を取得
  /settings [max_tokens=..] [temperature=..] [top_p=..]
  /reset           会話をリセット
  /help            このヘルプ
  /quit            終了
それ以外の入力はメッセージとして送信されます。";

/// One parsed line of user input
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Recommend(Option<usize>),
    Random,
    Persona(String),
    Info,
    Settings(Vec<String>),
    Reset,
    Help,
    Quit,
    Unknown(String),
    Message(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if !line.starts_with('/') {
            return Self::Message(line.to_string());
        }

        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let args: Vec<String> = parts.map(str::to_string).collect();

        match name {
            "/recommend" => Self::Recommend(args.first().and_then(|a| a.parse().ok())),
            "/random" => Self::Random,
            "/persona" => Self::Persona(args.first().cloned().unwrap_or_default()),
            "/info" => Self::Info,
            "/settings" => Self::Settings(args),
            "/reset" => Self::Reset,
            "/help" => Self::Help,
            "/quit" | "/exit" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

fn list_recommended() -> String {
    RECOMMENDED_PERSONAS
        .iter()
        .enumerate()
        .map(|(i, persona)| format!("  {}. {} (#{})", i + 1, persona.label, persona.index))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct Repl {
    client: PersonaChatClient,
    session: ChatSession,
}

impl Repl {
    pub fn new(client: PersonaChatClient) -> Self {
        Self {
            client,
            session: ChatSession::new(),
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let mut stdout = tokio::io::stdout();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        println!("Persona Chat ({})", self.client.base_url());
        match self.client.health().await {
            Ok(health) => println!(
                "サーバー: {} / モデル: {} (読み込み済み: {}) / ペルソナ数: {}",
                health.status, health.model, health.model_loaded, health.total_personas
            ),
            Err(e) => println!("サーバーに接続できません: {}", e),
        }
        println!("現在のペルソナ: {}\n/help でコマンド一覧", self.session.selection().label());

        loop {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match Command::parse(&line) {
                Command::Quit => break,
                Command::Help => println!("{}", HELP),
                Command::Recommend(None) => println!("{}", list_recommended()),
                Command::Recommend(Some(n)) => {
                    match n.checked_sub(1).map(PersonaSelection::recommended) {
                        Some(Ok(selection)) => self.select(selection),
                        Some(Err(e)) => println!("{}", e),
                        None => println!("番号は 1 から {} です", RECOMMENDED_PERSONAS.len()),
                    }
                }
                Command::Random => self.select(PersonaSelection::random()),
                Command::Persona(arg) => match arg.parse::<i64>() {
                    Ok(index) => match PersonaSelection::direct(index) {
                        Ok(selection) => self.select(selection),
                        Err(e) => println!("{}", e),
                    },
                    Err(_) => println!("使い方: /persona <番号>"),
                },
                Command::Info => self.show_persona().await,
                Command::Settings(assignments) => {
                    for assignment in &assignments {
                        if let Err(e) = self.session.settings_mut().apply(assignment) {
                            println!("{}", e);
                        }
                    }
                    let s = self.session.settings();
                    println!(
                        "max_tokens={} temperature={} top_p={}",
                        s.max_new_tokens, s.temperature, s.top_p
                    );
                }
                Command::Reset => {
                    self.session.reset();
                    println!("会話をリセットしました");
                }
                Command::Unknown(name) => println!("不明なコマンド: {} (/help)", name),
                Command::Message(text) => self.send(&text).await,
            }
        }

        Ok(())
    }

    fn select(&mut self, selection: PersonaSelection) {
        println!("ペルソナを選択: {}", selection.label());
        self.session.select(selection);
    }

    async fn show_persona(&mut self) {
        match self.client.get_persona(self.session.persona_index()).await {
            Ok(record) => {
                let card = PersonaCard::from(&record);
                println!("{}", card.render());
                self.session.set_persona_card(card);
            }
            Err(e) => println!("ペルソナ取得エラー: {}", e),
        }
    }

    async fn send(&mut self, text: &str) {
        let request = match self.session.begin_turn(text) {
            Ok(request) => request,
            Err(e) => {
                println!("{}", e);
                return;
            }
        };

        println!("(生成中...)");
        match self.client.chat(&request).await {
            Ok(response) => match self.session.complete_turn(response) {
                Ok(reply) => println!("{}", reply),
                Err(e) => println!("{}", e),
            },
            Err(e) => {
                warn!("Chat request failed: {}", e);
                if let Err(state_err) = self.session.fail_turn() {
                    warn!("Session out of sync: {}", state_err);
                }
                println!("エラー: {}", e);
            }
        }
    }
}
