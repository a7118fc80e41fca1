use crate::assistant::{Assistant, Explanation, Outcome, Phase, Session};
use crate::db::{Backend, QueryResult};
use crate::llm::CompletionModel;
use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const MAX_DISPLAY_ROWS: usize = 50;
const MAX_CELL_WIDTH: usize = 40;

const HELP: &str = "\
Type a question to have it turned into SQL and run.
  :sql <query>    run SQL directly
  :edit           show the failed query for editing
  :fix <query>    run a corrected version of the failed query
  :history        list past queries, newest first
  :replay <n>     re-run history entry n
  :schema         print the schema description
  :brief          print the schema brief sent to the model
  :raw            print the model's last raw reply
  :status         show the current step and the last failure
  :refresh        re-analyze the schema
  :help           show this help
  :quit           exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    Sql(String),
    Edit,
    Fix(String),
    History,
    Replay(usize),
    Schema,
    Brief,
    Raw,
    Status,
    Refresh,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Command::Empty;
        }
        if !line.starts_with(':') {
            return Command::Ask(line.to_string());
        }

        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        match name {
            ":sql" => Command::Sql(rest.to_string()),
            ":edit" => Command::Edit,
            ":fix" => Command::Fix(rest.to_string()),
            ":history" => Command::History,
            ":replay" => match rest.parse() {
                Ok(index) => Command::Replay(index),
                Err(_) => Command::Unknown(line.to_string()),
            },
            ":schema" => Command::Schema,
            ":brief" => Command::Brief,
            ":raw" => Command::Raw,
            ":status" => Command::Status,
            ":refresh" => Command::Refresh,
            ":help" | ":h" => Command::Help,
            ":quit" | ":q" | ":exit" => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

/// Renders a result as a fixed-width text grid, truncating long cells.
pub fn render_table(result: &QueryResult, max_rows: usize) -> String {
    if result.columns.is_empty() {
        return "(no columns)\n".to_string();
    }

    let clip = |value: &str| -> String {
        if value.chars().count() > MAX_CELL_WIDTH {
            let head: String = value.chars().take(MAX_CELL_WIDTH - 3).collect();
            format!("{}...", head)
        } else {
            value.to_string()
        }
    };

    let shown: Vec<Vec<String>> = result
        .rows
        .iter()
        .take(max_rows)
        .map(|row| row.iter().map(|v| clip(v)).collect())
        .collect();

    let mut widths: Vec<usize> = result.columns.iter().map(|c| c.chars().count()).collect();
    for row in &shown {
        for (i, value) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(value.chars().count());
            }
        }
    }

    let format_row = |values: &[String]| -> String {
        let cells: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, width)| format!("{:<width$}", values.get(i).map(String::as_str).unwrap_or(""), width = width))
            .collect();
        format!("| {} |\n", cells.join(" | "))
    };

    let mut output = format_row(&result.columns);
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    output.push_str(&format!("|-{}-|\n", separator.join("-|-")));
    for row in &shown {
        output.push_str(&format_row(row));
    }

    if result.row_count() > max_rows {
        output.push_str(&format!("... {} more rows\n", result.row_count() - max_rows));
    }
    output.push_str(&format!("({} rows)\n", result.row_count()));
    output
}

/// Interactive front end: one question or command per line.
pub struct AssistantApp<B: Backend, M: CompletionModel> {
    assistant: Assistant<B, M>,
    session: Session,
}

impl<B: Backend, M: CompletionModel> AssistantApp<B, M> {
    pub fn new(assistant: Assistant<B, M>) -> Self {
        Self {
            assistant,
            session: Session::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn analyze<W: Write>(&mut self, out: &mut W) -> Result<()> {
        self.assistant.analyze(&mut self.session).await?;
        if let Some(snapshot) = self.session.snapshot() {
            for warning in &snapshot.warnings {
                tracing::warn!("{}", warning);
            }
            writeln!(
                out,
                "Analyzed {} tables ({} columns, {} relationships).",
                snapshot.tables.len(),
                snapshot.column_count(),
                snapshot.relationships.len()
            )?;
        }
        Ok(())
    }

    /// Runs one line of input. Returns `false` once the user asks to quit.
    pub async fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<bool> {
        let command = Command::parse(line);
        if let Err(e) = self.dispatch(command.clone(), out).await {
            writeln!(out, "Error: {}", e)?;
        }
        Ok(command != Command::Quit)
    }

    async fn dispatch<W: Write>(&mut self, command: Command, out: &mut W) -> Result<()> {
        match command {
            Command::Ask(question) => {
                writeln!(out, "Generating SQL...")?;
                let outcome = self.assistant.ask(&mut self.session, &question).await?;
                self.print_outcome(&outcome, out)?;
            }
            Command::Sql(sql) => {
                let outcome = self.assistant.run_manual(&mut self.session, &sql).await?;
                self.print_outcome(&outcome, out)?;
            }
            Command::Edit => {
                let sql = self.assistant.begin_edit(&mut self.session)?;
                writeln!(out, "Failed query:\n{}\n\nSubmit the corrected query with :fix <query>", sql)?;
            }
            Command::Fix(sql) => {
                let outcome = self.assistant.submit_fix(&mut self.session, &sql).await?;
                self.print_outcome(&outcome, out)?;
            }
            Command::History => {
                if self.session.history().is_empty() {
                    writeln!(out, "No queries yet.")?;
                }
                for (index, entry) in self.session.history().newest_first().enumerate() {
                    let status = match &entry.error {
                        Some(error) => format!("failed: {}", error),
                        None => format!("{} rows", entry.row_count),
                    };
                    writeln!(
                        out,
                        "[{}] {} {} ({})\n    {}",
                        index,
                        entry.timestamp.format("%H:%M:%S"),
                        entry.question,
                        status,
                        entry.sql
                    )?;
                }
            }
            Command::Replay(index) => {
                let outcome = self.assistant.replay(&mut self.session, index).await?;
                self.print_outcome(&outcome, out)?;
            }
            Command::Schema => write!(out, "{}", self.session.description())?,
            Command::Brief => write!(out, "{}", self.session.brief())?,
            Command::Raw => match self.session.last_raw_response() {
                Some(raw) => writeln!(out, "{}", raw)?,
                None => writeln!(out, "No model reply yet.")?,
            },
            Command::Status => self.print_status(out)?,
            Command::Refresh => self.analyze(out).await?,
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Quit | Command::Empty => {}
            Command::Unknown(input) => writeln!(out, "Unknown command: {} (try :help)", input)?,
        }
        Ok(())
    }

    fn print_status<W: Write>(&self, out: &mut W) -> Result<()> {
        let trail: Vec<String> = self.session.phase_trail().iter().map(|p| p.to_string()).collect();
        writeln!(out, "Step: {}", self.session.phase())?;
        if !trail.is_empty() {
            writeln!(out, "Last run: {}", trail.join(" -> "))?;
        }
        writeln!(out, "Queries run: {}", self.session.history().len())?;
        if let Some(failure) = self.session.failure() {
            writeln!(out, "Last failure: {}\n    {}", failure.error, failure.sql)?;
        }
        Ok(())
    }

    fn prompt(&self) -> &'static str {
        match self.session.phase() {
            Phase::Editing => "fix> ",
            _ => "> ",
        }
    }

    fn print_outcome<W: Write>(&self, outcome: &Outcome, out: &mut W) -> Result<()> {
        match outcome {
            Outcome::Succeeded(answer) => {
                writeln!(out, "SQL:\n{}\n", answer.sql)?;
                write!(out, "{}", render_table(&answer.result, MAX_DISPLAY_ROWS))?;
                print_explanation(&answer.explanation, out)?;
            }
            Outcome::Failed(failure) => {
                writeln!(out, "SQL:\n{}\n", failure.sql)?;
                writeln!(out, "Query failed: {}", failure.error)?;
                print_explanation(&failure.explanation, out)?;
                writeln!(out, "Use :edit to fix the query.")?;
            }
        }
        Ok(())
    }

    /// Reads stdin until EOF or `:quit`.
    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = std::io::stdout();
        writeln!(stdout, "Ask a question about your data (:help for commands).")?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            write!(stdout, "{}", self.prompt())?;
            stdout.flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            if !self.handle_line(&line, &mut stdout).await? {
                break;
            }
        }
        Ok(())
    }
}

fn print_explanation<W: Write>(explanation: &Explanation, out: &mut W) -> Result<()> {
    match explanation {
        Explanation::Text(text) => writeln!(out, "\n{}", text)?,
        Explanation::Unavailable(reason) => writeln!(out, "\n(explanation unavailable: {})", reason)?,
    }
    Ok(())
}
