use clap::Parser;
use flatbase::executor::{DatabaseManager, Executor, Session};
use flatbase::highlight::Highlighter;
use log::error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Flat-file SQL database shell
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Database to select on start
    #[arg(value_name = "DATABASE NAME")]
    database: Option<String>,

    /// Directory holding one sub-directory per database
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Reject statements that change data
    #[arg(long)]
    read_only: bool,

    /// Echo statements without syntax highlighting
    #[arg(long)]
    no_color: bool,
}

struct CliSession {
    read_only: bool,
    database: Option<String>,
}

impl Session for CliSession {
    fn is_logged_in(&self) -> bool {
        true
    }

    fn can_modify_data(&self) -> bool {
        !self.read_only
    }

    fn current_database(&self) -> Option<&str> {
        self.database.as_deref()
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let db = match DatabaseManager::new(&args.data_dir) {
        Ok(db) => db,
        Err(e) => {
            error!("cannot open data directory: {e}");
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let session = CliSession {
        read_only: args.read_only,
        database: args.database,
    };
    // 데이터베이스 유무 체크
    let mut exec = match Executor::new(db, session) {
        Ok(exec) => exec,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let highlighter = (!args.no_color).then(Highlighter::new);

    println!("flatbase REPL (type '.exit' or '.quit' to stop)");
    let mut buffer = String::new();
    let mut lines = io::stdin().lock().lines();
    loop {
        if buffer.is_empty() {
            print!("sql> ");
        } else {
            print!("...  ");
        }
        if io::stdout().flush().is_err() {
            return ExitCode::FAILURE;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let input = match line {
            Ok(input) => input,
            Err(e) => {
                eprintln!("Failed to read line: {e}");
                return ExitCode::FAILURE;
            }
        };
        // 종료 명령어 처리
        if buffer.is_empty() && matches!(input.trim(), ".exit" | ".quit") {
            break;
        }
        buffer.push_str(&input);
        buffer.push('\n');
        if !input.trim_end().ends_with(';') {
            continue;
        }
        let src = std::mem::take(&mut buffer);
        match &highlighter {
            Some(highlighter) => print!("{}", highlighter.highlight(&src)),
            None => print!("{src}"),
        }
        for result in exec.run(&src) {
            println!("{result}");
        }
    }
    ExitCode::SUCCESS
}
