use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use quiz_generator::models::{Difficulty, QuestionType, SortingOption};
use quiz_generator::logging;
use quiz_generator::settings::AppLanguage;
use quiz_generator::{App, Config, QuizSession, SessionState};

#[derive(Parser, Debug)]
#[command(name = "quiz-generator")]
#[command(version, about = "Generate and take quizzes on any topic", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a quiz and take it
    Play {
        /// What the quiz is about
        topic: String,
        #[arg(short, long, default_value = "medium")]
        difficulty: Difficulty,
        /// multiple-choice or true-false
        #[arg(short = 't', long = "type", default_value = "multiple-choice")]
        question_type: QuestionType,
        /// Language for questions and answers; defaults to the app language
        #[arg(short, long)]
        language: Option<String>,
        /// Number of questions; defaults to the configured count
        #[arg(short, long)]
        count: Option<String>,
    },
    /// List favourite questions
    Questions {
        #[arg(short, long, default_value = "newest")]
        sort: SortingOption,
        #[arg(long)]
        delete: Option<i64>,
        #[arg(long)]
        delete_all: bool,
    },
    /// List saved quizzes
    Quizzes {
        #[arg(short, long, default_value = "newest")]
        sort: SortingOption,
        #[arg(long)]
        delete: Option<i64>,
        #[arg(long)]
        delete_all: bool,
    },
    /// Show or change app settings
    Settings {
        #[arg(long)]
        language: Option<AppLanguage>,
        #[arg(long)]
        dark_theme: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they never mix with the quiz on stdout
    let log_filter = logging::init();
    let config = Config::load();
    if std::env::var_os("RUST_LOG").is_none() {
        logging::apply_level(&log_filter, &config.logging.level);
    }

    if !config.has_api_key() && matches!(cli.command, Command::Play { .. }) {
        eprintln!("{}", "GEMINI_API_KEY is not set; generation will fail.".yellow());
    }

    let mut app = App::assemble(config)
        .await
        .context("Failed to start quiz generator")?;

    match cli.command {
        Command::Play {
            topic,
            difficulty,
            question_type,
            language,
            count,
        } => {
            let language = language.unwrap_or_else(|| app.settings.language().label().to_string());
            let request = app.request(
                &topic,
                difficulty,
                question_type,
                &language,
                count.as_deref(),
            )?;
            let session = app.new_session(request);
            play(&mut app, session).await?;
        }
        Command::Questions {
            sort,
            delete,
            delete_all,
        } => {
            let library = &mut app.questions;
            if delete_all {
                library.delete_all().await?;
                app.settings.questions_deleted = true;
                println!("{}", "All favourite questions deleted.".green());
            }
            library.fetch().await?;
            library.sort(sort);
            if let Some(id) = delete {
                match library.items().into_iter().find(|q| q.id == id) {
                    Some(question) => {
                        library.delete(&question).await?;
                        println!("{}", format!("Deleted question {id}.").green());
                    }
                    None => println!("{}", format!("No question with id {id}.").red()),
                }
            }
            let items = library.items();
            if items.is_empty() {
                println!("{}", "No favourite questions yet.".dimmed());
            }
            for question in items {
                println!("{} {}", format!("[{}]", question.id).cyan(), question.text.bold());
                for choice in &question.choices {
                    if *choice == question.answer {
                        println!("    {}", choice.green());
                    } else {
                        println!("    {choice}");
                    }
                }
            }
        }
        Command::Quizzes {
            sort,
            delete,
            delete_all,
        } => {
            let library = &mut app.quizzes;
            if delete_all {
                library.delete_all().await?;
                app.settings.quizzes_deleted = true;
                println!("{}", "All saved quizzes deleted.".green());
            }
            library.fetch().await?;
            library.sort(sort);
            if let Some(id) = delete {
                match library.items().into_iter().find(|q| q.id == id) {
                    Some(quiz) => {
                        library.delete(&quiz).await?;
                        println!("{}", format!("Deleted quiz {id}.").green());
                    }
                    None => println!("{}", format!("No quiz with id {id}.").red()),
                }
            }
            let items = library.items();
            if items.is_empty() {
                println!("{}", "No saved quizzes yet.".dimmed());
            }
            for quiz in items {
                let created = chrono::DateTime::from_timestamp_millis(quiz.created_at)
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{} {} {}",
                    format!("[{}]", quiz.id).cyan(),
                    quiz.topic.bold(),
                    format!("({} questions, {created})", quiz.questions.len()).dimmed()
                );
            }
        }
        Command::Settings {
            language,
            dark_theme,
        } => {
            if let Some(language) = language {
                app.settings.change_language(language).await?;
            }
            if let Some(dark_theme) = dark_theme {
                app.settings.change_theme(dark_theme).await?;
            }
            println!("Language:   {}", app.settings.language().to_string().bold());
            println!("Dark theme: {}", app.settings.dark_theme().to_string().bold());
        }
    }

    Ok(())
}

async fn play(app: &mut App, session: QuizSession) -> Result<()> {
    println!(
        "{}",
        format!("Generating questions about \"{}\"...", session.request().topic).dimmed()
    );

    let handle = session.spawn();
    let mut session = tokio::select! {
        session = handle.join() => session?,
        _ = tokio::signal::ctrl_c() => {
            // The handle lives inside the dropped join future and aborts the request
            println!("{}", "Cancelled.".yellow());
            return Ok(());
        }
    };

    match session.state() {
        SessionState::Ready { total } => {
            println!("{}", format!("{total} questions ready.").green());
            session.begin()?;
        }
        SessionState::Error { message } => {
            println!("{}", message.red());
            return Ok(());
        }
        other => anyhow::bail!("unexpected state after loading: {other:?}"),
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    while let SessionState::InProgress { index, total, .. } = session.state() {
        let Some(question) = session.current_question().cloned() else {
            break;
        };
        println!();
        println!(
            "{} {}",
            format!("Question {}/{}", index + 1, total).cyan(),
            question.text.bold()
        );
        for (n, choice) in question.choices.iter().enumerate() {
            println!("  {}. {}", n + 1, choice);
        }

        let Some(choice) = ask_choice(&mut input, &mut session, index, question.choices.len()).await?
        else {
            println!("{}", "Quiz abandoned.".yellow());
            return Ok(());
        };
        session.select_answer(&question.choices[choice])?;
        session.next()?;

        if question.is_correct(&question.choices[choice]) {
            println!("{}", "Correct!".green().bold());
        } else {
            println!("{} {}", "Wrong. Answer:".red().bold(), question.answer.green());
        }
        session.next()?;
    }

    if let SessionState::Completed { correct, total } = session.state() {
        let percent = session.state().score_percent().unwrap_or(0);
        println!();
        println!(
            "{}",
            format!("You got {correct} out of {total} correct ({percent}%).").bold()
        );

        if prompt_yes(&mut input, "Save this quiz? [y/N] ").await? {
            let quiz = session.save().await?;
            app.settings.created_quiz_saved = true;
            println!("{}", format!("Saved as quiz {}.", quiz.id).green());
        }
    }
    Ok(())
}

/// Reads a 1-based choice. `f` toggles the favourite, `q` quits.
async fn ask_choice(
    input: &mut Lines<BufReader<Stdin>>,
    session: &mut QuizSession,
    index: usize,
    choices: usize,
) -> Result<Option<usize>> {
    loop {
        print_prompt(
            &mut std::io::stdout(),
            &format!("Answer [1-{choices}], f = favourite, q = quit: "),
        )?;
        let Some(line) = input.next_line().await? else {
            return Ok(None);
        };
        match line.trim() {
            "q" => return Ok(None),
            "f" => {
                if session.toggle_favourite(index).await? {
                    println!("{}", "Added to favourites.".yellow());
                } else {
                    println!("{}", "Removed from favourites.".dimmed());
                }
            }
            other => match other.parse::<usize>() {
                Ok(n) if (1..=choices).contains(&n) => return Ok(Some(n - 1)),
                _ => println!("{}", format!("Pick a number from 1 to {choices}.").red()),
            },
        }
    }
}

async fn prompt_yes(input: &mut Lines<BufReader<Stdin>>, prompt: &str) -> Result<bool> {
    print_prompt(&mut std::io::stdout(), prompt)?;
    let line = input.next_line().await?.unwrap_or_default();
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}

fn print_prompt(out: &mut impl Write, prompt: &str) -> std::io::Result<()> {
    write!(out, "{prompt}")?;
    out.flush()
}
