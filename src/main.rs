use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use book_writer_lib::document::pdf_export::write_pdf;
use book_writer_lib::{
    AppConfig, AppState, BookDetails, DocumentRouter, GeminiClient, LibraryStore, SessionController,
};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

/// Book Writer - 逐页 AI 写书助手
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// 配置文件路径（默认使用平台配置目录下的 book-writer/config.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 开始一个写作会话
    Write {
        /// 书名
        #[arg(long)]
        title: String,

        /// 写作目标
        #[arg(long)]
        objective: String,

        /// 预计页数
        #[arg(long)]
        pages: u32,

        /// 种子上下文文件（.pdf / .txt / .md），可重复
        #[arg(long = "context")]
        context: Vec<PathBuf>,

        /// 全自动模式：检查点自动继续，直到完成
        #[arg(long)]
        auto: bool,
    },

    /// 管理书库
    Library {
        #[command(subcommand)]
        action: LibraryCommand,
    },

    /// 提取文档文本并打印
    Extract {
        /// 文档路径
        file: PathBuf,
    },

    /// 将文档渲染为 PDF
    Export {
        /// 文档路径
        file: PathBuf,

        /// 第一页标题
        #[arg(long)]
        title: String,

        /// 输出路径（默认为 `<title>.pdf`）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum LibraryCommand {
    /// 列出所有书籍（最新的在前）
    List,

    /// 显示一本书
    Show { id: i64 },

    /// 从文件导入一本书
    Add {
        file: PathBuf,

        /// 书名（默认为文件名）
        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        objective: Option<String>,
    },

    /// 删除一本书
    Delete { id: i64 },

    /// 将一本书导出为 PDF
    Export {
        id: i64,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    book_writer_lib::init_tracing();
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Write {
            title,
            objective,
            pages,
            context,
            auto,
        } => {
            let details = BookDetails::new(title, objective, pages);
            write(&config, details, &context, auto).await
        }
        Command::Library { action } => library(&config, action),
        Command::Extract { file } => {
            let doc = DocumentRouter::new().import_file(&file)?;
            println!("{}", doc.text);
            Ok(())
        }
        Command::Export { file, title, output } => {
            let doc = DocumentRouter::new().import_file(&file)?;
            let output = output.unwrap_or_else(|| default_pdf_name(&title));
            write_pdf(&output, Some(&title), &doc.text, &config.export)?;
            println!("已导出: {}", output.display());
            Ok(())
        }
    }
}

// ==================== 写作会话 ====================

async fn write(config: &AppConfig, details: BookDetails, context: &[PathBuf], auto: bool) -> anyhow::Result<()> {
    let router = DocumentRouter::new();
    let seed = if context.is_empty() {
        None
    } else {
        Some(router.import_seed_files(context)?)
    };

    let generator = GeminiClient::from_config(&config.generation)?;
    info!(model = generator.model(), "generation client ready");

    // 书库不可用时只禁用保存功能
    let store = match LibraryStore::open(&config.library.db_path) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!("library unavailable, saving disabled: {}", e);
            None
        }
    };

    let mut session = SessionController::new(config.session.clone());
    session.prepare_session(details, seed, auto)?;
    let mut input = Prompt::stdin();

    loop {
        match session.state() {
            AppState::Home => break,
            AppState::Writing => {
                let result = if session.is_auto_generating() {
                    session.run_automatic(&generator).await
                } else {
                    session.generate_next_page(&generator).await
                };

                if result.is_err() {
                    show_error(&mut session);
                    if !input.confirm("重试？[Y/n]")? {
                        session.go_home();
                    }
                    continue;
                }

                if session.state() == AppState::Writing && !session.is_auto_generating() {
                    writing_prompt(&mut session, &mut input)?;
                }
            }
            AppState::Checkpoint => checkpoint_prompt(config, &mut session, &router, &mut input)?,
            AppState::FinalReview => {
                final_review_prompt(config, &mut session, &generator, store.as_ref(), &mut input).await?;
                break;
            }
        }
    }

    Ok(())
}

fn writing_prompt(session: &mut SessionController, input: &mut Prompt) -> anyhow::Result<()> {
    if let Some(page) = session.pages().last() {
        let estimated = session.details().map(|d| d.estimated_pages).unwrap_or(0);
        println!("\n===== 第 {} / {} 页 ({}) =====", session.total_page_count(), estimated, session.phase());
        println!("{}", page);
    }

    loop {
        let line = input.ask("[回车] 下一页  [a] 自动  [e N 文件] 替换第 N 页  [q] 放弃")?;
        let mut parts = line.split_whitespace();
        match parts.next() {
            None => return Ok(()),
            Some("a") => {
                session.set_auto_generating(true);
                return Ok(());
            }
            Some("e") => {
                let (Some(index), Some(file)) = (parts.next(), parts.next()) else {
                    println!("用法: e N 文件");
                    continue;
                };
                let Ok(number) = index.parse::<usize>() else {
                    println!("页码无效: {}", index);
                    continue;
                };
                let text = match std::fs::read_to_string(file).with_context(|| format!("读取 {} 失败", file)) {
                    Ok(text) => text,
                    Err(e) => {
                        println!("{:#}", e);
                        continue;
                    }
                };
                match session.update_page(number.saturating_sub(1), text) {
                    Ok(()) => println!("第 {} 页已更新", number),
                    Err(e) => println!("{}", e),
                }
            }
            Some("q") => {
                session.go_home();
                return Ok(());
            }
            Some(other) => println!("未知命令: {}", other),
        }
    }
}

fn checkpoint_prompt(
    config: &AppConfig,
    session: &mut SessionController,
    router: &DocumentRouter,
    input: &mut Prompt,
) -> anyhow::Result<()> {
    println!("\n===== 检查点：已写 {} 页 =====", session.total_page_count());
    for page in session.checkpoint_pages() {
        println!("{}\n", page);
    }

    loop {
        let line = input.ask("[c] 继续  [x 路径] 导出最近页面  [r 文件] 用文档重新设定上下文  [q] 放弃")?;
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("c") => {
                session.continue_automatically()?;
                return Ok(());
            }
            Some("x") => {
                let path = parts
                    .next()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(session.checkpoint_export_name()));
                let title = session.details().map(|d| d.title.clone());
                match write_pdf(&path, title.as_deref(), &session.checkpoint_text(), &config.export) {
                    Ok(()) => println!("已导出: {}", path.display()),
                    Err(e) => {
                        session.report_error(e.to_string());
                        show_error(session);
                    }
                }
            }
            Some("r") => {
                let Some(file) = parts.next() else {
                    println!("用法: r 文件");
                    continue;
                };
                match router.import_file(Path::new(file)) {
                    Ok(doc) => {
                        session.reseed_from_document(&doc.text)?;
                        return Ok(());
                    }
                    Err(e) => {
                        session.report_error(e.to_string());
                        show_error(session);
                    }
                }
            }
            Some("q") => {
                session.go_home();
                return Ok(());
            }
            _ => println!("请选择 c / x / r / q"),
        }
    }
}

async fn final_review_prompt(
    config: &AppConfig,
    session: &mut SessionController,
    generator: &GeminiClient,
    store: Option<&LibraryStore>,
    input: &mut Prompt,
) -> anyhow::Result<()> {
    println!("\n===== 完成：共 {} 页 =====", session.total_page_count());

    loop {
        let line = input.ask("[p] 查看书稿  [t 语言] 翻译  [x 路径] 导出 PDF  [s] 保存到书库  [q] 结束")?;
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, Some(rest.trim()).filter(|r| !r.is_empty())),
            None => (line.as_str(), None),
        };

        match command {
            "p" => println!("{}", session.manuscript()),
            "t" => {
                let language = argument.unwrap_or(&config.generation.translation_language).to_string();
                let translated = session.translate(generator, &language).await.map(str::to_string);
                match translated {
                    Ok(text) => println!("{}", text),
                    Err(_) => show_error(session),
                }
            }
            "x" => {
                let title = session.details().map(|d| d.title.clone()).unwrap_or_default();
                let path = argument
                    .map(PathBuf::from)
                    .unwrap_or_else(|| default_pdf_name(&title));
                match write_pdf(&path, Some(&title), &session.manuscript(), &config.export) {
                    Ok(()) => println!("已导出: {}", path.display()),
                    Err(e) => {
                        session.report_error(e.to_string());
                        show_error(session);
                    }
                }
            }
            "s" => match store {
                Some(store) => match session.save_to_library(store) {
                    Ok(id) => println!("已保存到书库 (ID {})", id),
                    Err(_) => show_error(session),
                },
                None => println!("书库不可用"),
            },
            "q" => {
                session.go_home();
                return Ok(());
            }
            _ => println!("请选择 p / t / x / s / q"),
        }
    }
}

fn show_error(session: &mut SessionController) {
    if let Some(message) = session.error() {
        println!("错误: {}", message);
    }
    session.dismiss_error();
}

// ==================== 书库 ====================

fn library(config: &AppConfig, action: LibraryCommand) -> anyhow::Result<()> {
    let store = LibraryStore::open(&config.library.db_path)?;

    match action {
        LibraryCommand::List => {
            let books = store.list()?;
            if books.is_empty() {
                println!("书库为空");
            }
            for book in books {
                println!(
                    "{:>4}  {}  {}  ({} 字)",
                    book.id,
                    book.created_at.format("%Y-%m-%d %H:%M"),
                    book.title,
                    book.content.chars().count()
                );
            }
        }
        LibraryCommand::Show { id } => {
            let Some(book) = store.get(id)? else {
                bail!("书籍不存在: {}", id);
            };
            println!("# {}\n", book.title);
            if !book.objective.is_empty() {
                println!("{}\n", book.objective);
            }
            println!("{}", book.content);
        }
        LibraryCommand::Add { file, title, objective } => {
            let book = DocumentRouter::new()
                .import_file(&file)?
                .into_library_book(title, objective)?;
            let id = store.add(&book)?;
            println!("已添加《{}》 (ID {})", book.title, id);
        }
        LibraryCommand::Delete { id } => {
            if store.delete(id)? {
                println!("已删除 {}", id);
            } else {
                println!("书籍不存在: {}", id);
            }
        }
        LibraryCommand::Export { id, output } => {
            let Some(book) = store.get(id)? else {
                bail!("书籍不存在: {}", id);
            };
            let output = output.unwrap_or_else(|| default_pdf_name(&book.title));
            write_pdf(&output, Some(&book.title), &book.content, &config.export)?;
            println!("已导出: {}", output.display());
        }
    }

    Ok(())
}

fn default_pdf_name(title: &str) -> PathBuf {
    let stem = title.trim();
    PathBuf::from(format!("{}.pdf", if stem.is_empty() { "book" } else { stem }))
}

// ==================== 终端输入 ====================

struct Prompt {
    lines: io::Lines<io::StdinLock<'static>>,
}

impl Prompt {
    fn stdin() -> Self {
        Self {
            lines: io::stdin().lock().lines(),
        }
    }

    /// 输入结束时视为放弃
    fn ask(&mut self, question: &str) -> anyhow::Result<String> {
        print!("{} > ", question);
        io::stdout().flush()?;
        match self.lines.next() {
            Some(line) => Ok(line?.trim().to_string()),
            None => Ok("q".to_string()),
        }
    }

    fn confirm(&mut self, question: &str) -> anyhow::Result<bool> {
        let answer = self.ask(question)?;
        Ok(!matches!(answer.as_str(), "n" | "N" | "q"))
    }
}
