use std::io::{self, BufRead, Write};

use chrono::Utc;
use tracing::{error, info, instrument};

use crate::api::TaskApi;
use crate::auth::{self, Credentials};
use crate::cli::{Command, ListCommand, PasswordArg};
use crate::error::{ApiError, ValidationError, user_message};
use crate::model::{ListId, UserId};
use crate::render::Renderer;
use crate::session::Session;
use crate::view_state::{Action, ViewState};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_INVALID: i32 = 2;

/// Early exit from a command: a settled exit code, or an unexpected error
/// (I/O, rendering) that propagates to `main`.
#[derive(Debug)]
enum Exit {
    Code(i32),
    Error(anyhow::Error),
}

impl From<anyhow::Error> for Exit {
    fn from(err: anyhow::Error) -> Self {
        Exit::Error(err)
    }
}

pub struct Dispatch<'a, A: TaskApi> {
    pub api: A,
    pub session: Session,
    pub renderer: &'a mut Renderer,
    pub fallback_user: UserId,
    pub list_override: Option<ListId>,
}

#[instrument(skip_all)]
pub fn dispatch<A: TaskApi>(ctx: Dispatch<'_, A>, command: Option<Command>) -> anyhow::Result<i32> {
    let command = command.unwrap_or(Command::Tasks);
    let result = match command {
        Command::Register {
            name,
            email,
            password,
        } => run_register(ctx, &name, email, password),
        Command::Login { email, password } => run_login(ctx, email, password),
        Command::Logout => run_logout(ctx),
        Command::Theme { theme } => run_theme(ctx, theme),
        other => run_view(ctx, other),
    };

    match result {
        Ok(()) => Ok(EXIT_OK),
        Err(Exit::Code(code)) => Ok(code),
        Err(Exit::Error(err)) => Err(err),
    }
}

fn run_register<A: TaskApi>(
    mut ctx: Dispatch<'_, A>,
    name: &str,
    email: String,
    password: PasswordArg,
) -> Result<(), Exit> {
    let creds = Credentials {
        email,
        password: resolve_password(password)?,
    };
    let user = settle_auth(auth::register(&ctx.api, &ctx.session, name, &creds))?;
    ctx.renderer
        .print_message(&format!("Welcome, {}! You are signed in.", user.name))?;
    Ok(())
}

fn run_login<A: TaskApi>(
    mut ctx: Dispatch<'_, A>,
    email: String,
    password: PasswordArg,
) -> Result<(), Exit> {
    let creds = Credentials {
        email,
        password: resolve_password(password)?,
    };
    let user = settle_auth(auth::login(&ctx.api, &ctx.session, &creds))?;
    ctx.renderer
        .print_message(&format!("Signed in as {} <{}>.", user.name, user.email))?;
    Ok(())
}

fn run_logout<A: TaskApi>(mut ctx: Dispatch<'_, A>) -> Result<(), Exit> {
    auth::logout(&ctx.session)?;
    ctx.renderer.print_message("Signed out.")?;
    Ok(())
}

fn run_theme<A: TaskApi>(
    mut ctx: Dispatch<'_, A>,
    theme: Option<crate::session::Theme>,
) -> Result<(), Exit> {
    match theme {
        Some(theme) => {
            ctx.session.save_theme(theme)?;
            ctx.renderer
                .print_message(&format!("Theme set to {theme}."))?;
        }
        None => {
            let theme = ctx.session.load_theme()?;
            ctx.renderer.print_message(theme.storage_value())?;
        }
    }
    Ok(())
}

fn run_view<A: TaskApi>(ctx: Dispatch<'_, A>, command: Command) -> Result<(), Exit> {
    let Dispatch {
        api,
        session,
        renderer,
        fallback_user,
        list_override,
    } = ctx;
    let mut view = ViewState::new(api, session, fallback_user);

    settle(Action::Load, view.load())?;
    if list_override.is_some() {
        settle(Action::SelectList, view.select_list(list_override))?;
    }

    match command {
        Command::Whoami => match view.user() {
            Some(user) => renderer.print_user(user)?,
            None => renderer.print_message("Not signed in.")?,
        },
        Command::Lists => renderer.print_lists(view.lists(), view.active_list_id())?,
        Command::List(list_command) => run_list_command(&mut view, renderer, list_command)?,
        Command::Tasks => print_active(&view, renderer)?,
        Command::Add {
            title,
            priority,
            due,
        } => {
            let task = settle(
                Action::CreateTask,
                view.create_task(&title.join(" "), priority, due),
            )?;
            renderer.print_task_line("Added", &task)?;
        }
        Command::Toggle { id } => match settle(Action::ToggleTask, view.toggle_task(id))? {
            Some(task) => {
                let verb = if task.completed { "Completed" } else { "Reopened" };
                renderer.print_task_line(verb, &task)?;
            }
            None => renderer.print_message(&format!("No task {id} in this list."))?,
        },
        Command::Rm { id } => {
            settle(Action::DeleteTask, view.delete_task(id))?;
            renderer.print_message(&format!("Deleted task {id}."))?;
        }
        Command::Priority { id, priority } => {
            let task = settle(Action::SetPriority, view.set_priority(id, priority))?;
            renderer.print_task_line("Updated", &task)?;
        }
        Command::FinishAll => {
            if view.active_list_id().is_none() {
                renderer.print_message("No list selected.")?;
            } else {
                settle(Action::FinishAll, view.finish_all())?;
                print_active(&view, renderer)?;
            }
        }
        Command::Register { .. }
        | Command::Login { .. }
        | Command::Logout
        | Command::Theme { .. } => {
            return Err(Exit::Error(anyhow::anyhow!(
                "session command routed to list view"
            )));
        }
    }
    Ok(())
}

fn run_list_command<A: TaskApi>(
    view: &mut ViewState<A>,
    renderer: &mut Renderer,
    command: ListCommand,
) -> Result<(), Exit> {
    match command {
        ListCommand::Add { name, emoji } => {
            let list = settle(
                Action::CreateList,
                view.create_list(&name.join(" "), emoji.as_deref()),
            )?;
            renderer.print_message(&format!(
                "Created list {} {} ({}), now active.",
                list.emoji, list.name, list.id
            ))?;
        }
        ListCommand::Rm { id, yes } => {
            let Some(list) = view.lists().iter().find(|list| list.id == id).cloned() else {
                return Err(report(
                    Action::DeleteList,
                    ValidationError::UnknownList(id).into(),
                ));
            };

            view.request_delete_list(id);
            let question = format!(
                "Delete list '{} {}' and all its tasks? [y/N] ",
                list.emoji, list.name
            );
            if !yes && !ask_confirmation(&question)? {
                view.cancel_delete_list();
                renderer.print_message("Cancelled.")?;
                return Ok(());
            }

            settle(Action::DeleteList, view.confirm_delete_list())?;
            renderer.print_message(&format!("Deleted list {} {}.", list.emoji, list.name))?;
            match view.active_list() {
                Some(active) => renderer
                    .print_message(&format!("Active list: {} {}", active.emoji, active.name))?,
                None => renderer.print_message("No lists left.")?,
            }
        }
        ListCommand::Rename { id, name, emoji } => {
            let list = settle(
                Action::RenameList,
                view.rename_list(id, name.as_deref(), emoji.as_deref()),
            )?;
            renderer.print_message(&format!("List {} is now {} {}.", list.id, list.emoji, list.name))?;
        }
        ListCommand::Use { id } => {
            settle(Action::SelectList, view.use_list(Some(id)))?;
            print_active(view, renderer)?;
        }
    }
    Ok(())
}

fn print_active<A: TaskApi>(view: &ViewState<A>, renderer: &mut Renderer) -> anyhow::Result<()> {
    renderer.print_header(view.user(), view.active_list(), view.counts())?;
    if view.active_list_id().is_some() {
        renderer.print_task_table(view.tasks(), Utc::now())?;
    }
    Ok(())
}

/// Applies the failure policy for `action` to `result`.
fn settle<T>(action: Action, result: anyhow::Result<T>) -> Result<T, Exit> {
    result.map_err(|err| report(action, err))
}

fn report(action: Action, err: anyhow::Error) -> Exit {
    if let Some(validation) = err.downcast_ref::<ValidationError>() {
        eprintln!("{validation}");
        return Exit::Code(EXIT_INVALID);
    }

    error!(?action, error = %format!("{err:#}"), "action failed");
    if !action.alerts_on_failure() {
        return Exit::Code(EXIT_OK);
    }

    eprintln!("{}", action.alert_message());
    if let Some(detail) = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<ApiError>())
        .and_then(ApiError::detail)
    {
        eprintln!("  {detail}");
    }
    Exit::Code(EXIT_FAILED)
}

fn settle_auth<T>(result: anyhow::Result<T>) -> Result<T, Exit> {
    result.map_err(|err| {
        if err.downcast_ref::<ValidationError>().is_some() {
            eprintln!("{}", user_message(&err));
            return Exit::Code(EXIT_INVALID);
        }
        error!(error = %format!("{err:#}"), "authentication failed");
        eprintln!("{}", user_message(&err));
        Exit::Code(EXIT_FAILED)
    })
}

fn resolve_password(arg: PasswordArg) -> anyhow::Result<String> {
    if let Some(password) = arg.password {
        return Ok(password);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    info!("read password from stdin");
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn ask_confirmation(question: &str) -> anyhow::Result<bool> {
    eprint!("{question}");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(
        line.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
