use std::str::FromStr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

use crate::{
    controller::{CreateOutcome, CreateReminderRequest, ReminderController},
    error::ReminderError,
    reminder::{ReminderId, ReminderKind},
};

const HELP: &str = "\
Commands:
  add <day> <HH:MM> <title>   reminder on a day of this month
  quick <seconds> <title>     reminder in a few seconds
  list                        saved reminders
  delete <id>                 delete a reminder
  daily <HH:MM>               turn the daily reminder on
  daily off                   turn the daily reminder off
  calendar <month> <year>     days with activity
  help
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add {
        day: u32,
        time: String,
        kind: Option<ReminderKind>,
        title: String,
    },
    Quick {
        seconds: u32,
        title: String,
    },
    List,
    Delete(ReminderId),
    Daily(String),
    DailyOff,
    Calendar {
        month: u32,
        year: i32,
    },
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = ReminderError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().unwrap_or_default().to_lowercase();
        let rest = |words: std::str::SplitWhitespace<'_>| words.collect::<Vec<_>>().join(" ");

        match name.as_str() {
            "add" => {
                let day = number(words.next(), "day")?;
                let time = words
                    .next()
                    .ok_or_else(|| ReminderError::invalid_input("time", "missing"))?
                    .to_string();
                let mut title = rest(words);
                let mut kind = None;
                // Optional "#kind" prefix, e.g. `add 20 08:00 #meditacion Meditar`
                if let Some(tagged) = title.strip_prefix('#') {
                    let (tag, remainder) = tagged.split_once(' ').unwrap_or((tagged, ""));
                    kind = Some(ReminderKind::new(tag));
                    title = remainder.to_string();
                }
                Ok(Command::Add {
                    day,
                    time,
                    kind,
                    title,
                })
            }
            "quick" => Ok(Command::Quick {
                seconds: number(words.next(), "seconds")?,
                title: rest(words),
            }),
            "list" => Ok(Command::List),
            "delete" => Ok(Command::Delete(number(words.next(), "id")?)),
            "daily" => match words.next() {
                Some("off") => Ok(Command::DailyOff),
                Some(time) => Ok(Command::Daily(time.to_string())),
                None => Err(ReminderError::invalid_input("time", "missing")),
            },
            "calendar" => Ok(Command::Calendar {
                month: number(words.next(), "month")?,
                year: number(words.next(), "year")?,
            }),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(ReminderError::invalid_input(
                "command",
                format!("unknown command \"{other}\", try \"help\""),
            )),
        }
    }
}

fn number<T: FromStr>(word: Option<&str>, field: &'static str) -> Result<T, ReminderError> {
    let word = word.ok_or_else(|| ReminderError::invalid_input(field, "missing"))?;
    word.parse()
        .map_err(|_| ReminderError::invalid_input(field, format!("\"{word}\" is not a number")))
}

/// Line based front end over the reminder controller.
///
/// Destructive commands ask for a `y` before going ahead.
pub struct ConsoleInterface<'a, R, W> {
    controller: &'a ReminderController,
    input: Lines<R>,
    output: W,
}

impl<'a, R, W> ConsoleInterface<'a, R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(controller: &'a ReminderController, input: R, output: W) -> Self {
        Self {
            controller,
            input: input.lines(),
            output,
        }
    }

    /// Runs until `quit` or end of input. Only I/O errors end the loop early.
    pub async fn run(mut self) -> anyhow::Result<()> {
        self.say(HELP).await?;

        while let Some(line) = self.input.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let command = match line.parse::<Command>() {
                Ok(command) => command,
                Err(error) => {
                    self.say(&format!("{error}")).await?;
                    continue;
                }
            };
            log::debug!("Console command: {command:?}");

            if command == Command::Quit {
                break;
            }
            self.handle(command).await?;
        }

        self.output.flush().await?;
        Ok(())
    }

    async fn handle(&mut self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Add {
                day,
                time,
                kind,
                title,
            } => {
                let mut request = CreateReminderRequest::new(title, day, time);
                if let Some(kind) = kind {
                    request = request.with_kind(kind);
                }
                let result = self.controller.create_reminder(request).await;
                self.report_created(result).await?;
            }
            Command::Quick { seconds, title } => {
                let result = self.controller.create_quick_reminder(&title, seconds).await;
                self.report_created(result).await?;
            }
            Command::List => self.list().await?,
            Command::Delete(id) => self.delete(id).await?,
            Command::Daily(time) => match self.controller.enable_daily_reminder(&time).await {
                Ok(outcome) => {
                    self.say(&format!("Daily reminder set for {time}")).await?;
                    self.report_warnings(&outcome.warnings).await?;
                }
                Err(error) => self.say(&format!("{error}")).await?,
            },
            Command::DailyOff => {
                let pending = self.controller.request_disable_daily();
                if self.confirm("Turn the daily reminder off?").await? {
                    match self.controller.confirm_disable_daily(pending).await {
                        Ok(()) => self.say("Daily reminder turned off").await?,
                        Err(error) => self.say(&format!("{error}")).await?,
                    }
                }
            }
            Command::Calendar { month, year } => {
                match self.controller.calendar_month(month, year).await {
                    Ok(days) if days.is_empty() => self.say("No activity").await?,
                    Ok(days) => {
                        let days: Vec<String> = days.iter().map(u32::to_string).collect();
                        self.say(&format!("Days with activity: {}", days.join(", "))).await?;
                    }
                    Err(error) => self.say(&format!("{error}")).await?,
                }
            }
            Command::Help => self.say(HELP).await?,
            Command::Quit => {}
        }

        Ok(())
    }

    async fn report_created(
        &mut self,
        result: Result<CreateOutcome, ReminderError>,
    ) -> anyhow::Result<()> {
        match result {
            Ok(outcome) => {
                let at = outcome.reminder.scheduled_at_in(&self.controller.timezone());
                self.say(&format!(
                    "Saved #{} \"{}\" for {}",
                    outcome.reminder.id,
                    outcome.reminder.title,
                    at.format("%Y-%m-%d %H:%M")
                ))
                .await?;
                self.report_warnings(&outcome.warnings).await
            }
            Err(error) => self.say(&format!("{error}")).await,
        }
    }

    async fn report_warnings(&mut self, warnings: &[ReminderError]) -> anyhow::Result<()> {
        for warning in warnings {
            self.say(&format!("Warning: {warning}")).await?;
        }
        Ok(())
    }

    async fn list(&mut self) -> anyhow::Result<()> {
        let reminders = match self.controller.refresh().await {
            Ok(reminders) => reminders,
            Err(error) => return self.say(&format!("{error}")).await,
        };
        if reminders.is_empty() {
            return self.say("No reminders").await;
        }

        let timezone = self.controller.timezone();
        for reminder in reminders {
            let at = reminder.scheduled_at_in(&timezone);
            let line = if reminder.is_daily_recurring {
                format!("#{} every day at {} {}", reminder.id, at.format("%H:%M"), reminder.title)
            } else {
                format!(
                    "#{} {} {} [{}]{}",
                    reminder.id,
                    at.format("%Y-%m-%d %H:%M"),
                    reminder.title,
                    reminder.kind,
                    if reminder.completed { " done" } else { "" }
                )
            };
            self.say(&line).await?;
        }

        Ok(())
    }

    async fn delete(&mut self, id: ReminderId) -> anyhow::Result<()> {
        let pending = match self.controller.request_deletion(id).await {
            Ok(pending) => pending,
            Err(error) => return self.say(&format!("{error}")).await,
        };

        let question = format!("Delete \"{}\"?", pending.title());
        if !self.confirm(&question).await? {
            return self.say("Kept").await;
        }

        match self.controller.confirm_deletion(pending).await {
            Ok(()) => self.say(&format!("Deleted #{id}")).await,
            Err(error) => self.say(&format!("{error}")).await,
        }
    }

    async fn confirm(&mut self, question: &str) -> anyhow::Result<bool> {
        self.say(&format!("{question} [y/N]")).await?;
        let answer = self.input.next_line().await?.unwrap_or_default();

        Ok(matches!(
            answer.trim().to_lowercase().as_str(),
            "y" | "yes" | "s" | "si" | "sí"
        ))
    }

    async fn say(&mut self, text: &str) -> anyhow::Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        Ok(())
    }
}
