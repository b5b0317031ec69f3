use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::model::{ListId, Priority, Task, TaskList, User};
use crate::reltime::format_relative;
use crate::session::Theme;
use crate::view_state::TaskCounts;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    theme: Theme,
    tz: Tz,
}

impl Renderer {
    pub fn new(cfg: &Config, theme: Theme) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color,
            theme,
            tz: cfg.display_timezone()?,
        })
    }

    pub fn print_user(&mut self, user: &User) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "id        {}", user.id)?;
        writeln!(out, "name      {}", user.name)?;
        writeln!(out, "email     {}", user.email)?;
        if let Some(avatar) = user.avatar_url.as_deref() {
            writeln!(out, "avatar    {avatar}")?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, lists))]
    pub fn print_lists(&mut self, lists: &[TaskList], active: Option<ListId>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if lists.is_empty() {
            writeln!(out, "No lists yet. Create one with `bettertasks list add <name>`.")?;
            return Ok(());
        }

        let headers = vec!["".to_string(), "ID".to_string(), "List".to_string()];
        let rows = lists
            .iter()
            .map(|list| {
                let marker = if Some(list.id) == active {
                    self.paint("*", self.accent())
                } else {
                    String::new()
                };
                vec![
                    marker,
                    self.paint(&list.id.to_string(), "33"),
                    format!("{} {}", list.emoji, list.name),
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, list, counts))]
    pub fn print_header(
        &mut self,
        user: Option<&User>,
        list: Option<&TaskList>,
        counts: TaskCounts,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let who = user.map(|u| u.name.as_str()).unwrap_or("unknown user");
        match list {
            Some(list) => writeln!(
                out,
                "{} {} {}  ({} open, {} done)",
                self.paint(who, self.accent()),
                list.emoji,
                list.name,
                counts.open,
                counts.completed
            )?,
            None => writeln!(out, "{}  (no list selected)", self.paint(who, self.accent()))?,
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, tasks, now))]
    pub fn print_task_table(&mut self, tasks: &[Task], now: DateTime<Utc>) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if tasks.is_empty() {
            writeln!(out, "No tasks. Add one with `bettertasks add <title>`.")?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Priority".to_string(),
            "Title".to_string(),
            "Created".to_string(),
        ];

        let rows = tasks
            .iter()
            .map(|task| {
                let done = if task.completed { "[x]" } else { "[ ]" };
                let title = if task.completed {
                    self.paint(&task.title, "9")
                } else {
                    task.title.clone()
                };
                vec![
                    self.paint(&task.id.to_string(), "33"),
                    done.to_string(),
                    self.paint(task.priority.as_str(), self.priority_code(task.priority)),
                    title,
                    format_relative(&task.created_at, now, &self.tz),
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    pub fn print_task_line(&mut self, verb: &str, task: &Task) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(
            out,
            "{verb} task {} '{}' [{}]{}",
            task.id,
            task.title,
            task.priority,
            if task.completed { " (done)" } else { "" }
        )?;
        Ok(())
    }

    pub fn print_message(&mut self, message: &str) -> anyhow::Result<()> {
        writeln!(io::stdout().lock(), "{message}")?;
        Ok(())
    }

    fn accent(&self) -> &'static str {
        match self.theme {
            Theme::Light => "34",
            Theme::Dark => "96",
        }
    }

    fn priority_code(&self, priority: Priority) -> &'static str {
        match (self.theme, priority) {
            (Theme::Light, Priority::High) => "31",
            (Theme::Light, Priority::Medium) => "33",
            (Theme::Light, Priority::Low) => "32",
            (Theme::Dark, Priority::High) => "91",
            (Theme::Dark, Priority::Medium) => "93",
            (Theme::Dark, Priority::Low) => "92",
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
