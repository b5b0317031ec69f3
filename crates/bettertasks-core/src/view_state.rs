//! In-memory view of the signed-in user's lists and tasks, kept consistent
//! with the server by replacing local entities with whatever each mutation
//! returns.

use anyhow::Context;
use tracing::{debug, info, instrument, warn};

use crate::api::TaskApi;
use crate::confirm::ConfirmPrompt;
use crate::error::ValidationError;
use crate::model::{
    DEFAULT_LIST_EMOJI, DEFAULT_LIST_NAME, ListId, ListPatch, NEW_LIST_EMOJI, NewList, NewTask,
    Priority, Task, TaskId, TaskList, TaskPatch, User, UserId,
};
use crate::session::Session;

/// User intents the controller handles. Used to decide how a failure is
/// surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Load,
    SelectList,
    ToggleTask,
    DeleteTask,
    CreateTask,
    FinishAll,
    SetPriority,
    CreateList,
    RenameList,
    DeleteList,
}

impl Action {
    /// Creation and list deletion failures block with an alert; the others
    /// are only logged and leave state untouched.
    pub fn alerts_on_failure(self) -> bool {
        matches!(
            self,
            Action::Load
                | Action::SelectList
                | Action::CreateTask
                | Action::CreateList
                | Action::RenameList
                | Action::DeleteList
        )
    }

    pub fn alert_message(self) -> &'static str {
        match self {
            Action::Load => "Failed to load your lists. Make sure the backend is running.",
            Action::SelectList => "Failed to load tasks for that list.",
            Action::CreateTask => "Failed to add task. Make sure the backend is running.",
            Action::CreateList => "Failed to add list. Is the backend running?",
            Action::RenameList => "Failed to update list. Is the backend running?",
            Action::DeleteList => "Failed to delete list. Is the backend running?",
            Action::ToggleTask => "Failed to toggle task.",
            Action::DeleteTask => "Failed to delete task.",
            Action::FinishAll => "Failed to finish all tasks.",
            Action::SetPriority => "Failed to set priority.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskCounts {
    pub open: usize,
    pub completed: usize,
}

pub struct ViewState<A: TaskApi> {
    api: A,
    session: Session,
    fallback_user: UserId,
    user: Option<User>,
    lists: Vec<TaskList>,
    active_list: Option<ListId>,
    tasks: Vec<Task>,
    delete_prompt: ConfirmPrompt<ListId>,
}

impl<A: TaskApi> ViewState<A> {
    pub fn new(api: A, session: Session, fallback_user: UserId) -> Self {
        Self {
            api,
            session,
            fallback_user,
            user: None,
            lists: Vec::new(),
            active_list: None,
            tasks: Vec::new(),
            delete_prompt: ConfirmPrompt::Closed,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn lists(&self) -> &[TaskList] {
        &self.lists
    }

    pub fn active_list_id(&self) -> Option<ListId> {
        self.active_list
    }

    pub fn active_list(&self) -> Option<&TaskList> {
        let id = self.active_list?;
        self.lists.iter().find(|list| list.id == id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn counts(&self) -> TaskCounts {
        let completed = self.tasks.iter().filter(|task| task.completed).count();
        TaskCounts {
            open: self.tasks.len() - completed,
            completed,
        }
    }

    pub fn pending_list_deletion(&self) -> Option<ListId> {
        self.delete_prompt.pending().copied()
    }

    /// Id used to scope list queries: the loaded user, else the stored
    /// session, else the configured fallback.
    pub fn owner_id(&self) -> anyhow::Result<UserId> {
        if let Some(user) = self.user.as_ref() {
            return Ok(user.id);
        }
        Ok(self
            .session
            .load_user_id()?
            .unwrap_or(self.fallback_user))
    }

    /// Fetches the user and their lists, then activates the remembered list
    /// if it still exists, otherwise the first one. No lists is a valid empty
    /// state.
    #[instrument(skip(self))]
    pub fn load(&mut self) -> anyhow::Result<()> {
        let user_id = match self.session.load_user_id()? {
            Some(id) => id,
            None => {
                debug!(fallback = self.fallback_user, "no stored session user, using fallback");
                self.fallback_user
            }
        };

        let user = self
            .api
            .get_user(user_id)
            .with_context(|| format!("failed to fetch user {user_id}"))?;
        let lists = self
            .api
            .get_lists(user_id)
            .with_context(|| format!("failed to fetch lists for user {user_id}"))?;
        info!(user_id, lists = lists.len(), "loaded user data");

        self.user = Some(user);
        self.lists = lists;
        self.active_list = None;
        self.tasks.clear();

        let remembered = self
            .session
            .load_active_list()?
            .filter(|id| self.lists.iter().any(|list| list.id == *id));
        let target = remembered.or_else(|| self.lists.first().map(|list| list.id));
        if target.is_none() {
            warn!(user_id, "user has no lists");
        }
        self.select_list(target)
    }

    /// Changes the active list for this session only. A different id
    /// refetches that list's tasks and replaces the whole collection; `None`
    /// clears it. The stored choice is left alone.
    #[instrument(skip(self))]
    pub fn select_list(&mut self, list_id: Option<ListId>) -> anyhow::Result<()> {
        if self.set_active(list_id)?
            && let Some(id) = list_id
        {
            self.refetch_tasks(id)?;
        }
        Ok(())
    }

    /// Like [`select_list`](Self::select_list), and also stores the choice
    /// so later loads start from it.
    #[instrument(skip(self))]
    pub fn use_list(&mut self, list_id: Option<ListId>) -> anyhow::Result<()> {
        let changed = self.set_active(list_id)?;
        self.remember_active_list();
        if changed && let Some(id) = list_id {
            self.refetch_tasks(id)?;
        }
        Ok(())
    }

    /// Switch that follows a server mutation that already succeeded. The
    /// choice is stored; a failed refetch is logged and leaves the
    /// collection empty.
    fn follow_list(&mut self, list_id: Option<ListId>) -> anyhow::Result<()> {
        let changed = self.set_active(list_id)?;
        self.remember_active_list();
        if changed
            && let Some(id) = list_id
            && let Err(err) = self.refetch_tasks(id)
        {
            warn!(list_id = id, error = %format!("{err:#}"), "task refetch failed after list change");
        }
        Ok(())
    }

    /// Returns whether the active list actually changed.
    fn set_active(&mut self, list_id: Option<ListId>) -> anyhow::Result<bool> {
        if let Some(id) = list_id
            && !self.lists.iter().any(|list| list.id == id)
        {
            return Err(ValidationError::UnknownList(id).into());
        }
        if list_id == self.active_list {
            return Ok(false);
        }

        self.active_list = list_id;
        if list_id.is_none() {
            self.tasks.clear();
        }
        Ok(true)
    }

    fn remember_active_list(&self) {
        if let Err(err) = self.session.save_active_list(self.active_list) {
            warn!(error = %err, "failed to remember active list");
        }
    }

    fn refetch_tasks(&mut self, list_id: ListId) -> anyhow::Result<()> {
        match self.api.get_tasks(list_id) {
            Ok(tasks) => {
                debug!(list_id, count = tasks.len(), "fetched tasks");
                self.tasks = tasks;
                Ok(())
            }
            Err(err) => {
                self.tasks.clear();
                Err(err).with_context(|| format!("failed to fetch tasks for list {list_id}"))
            }
        }
    }

    /// Flips completion on the server and adopts the returned task. Unknown
    /// ids are ignored.
    #[instrument(skip(self))]
    pub fn toggle_task(&mut self, task_id: TaskId) -> anyhow::Result<Option<Task>> {
        let Some(current) = self.task(task_id) else {
            debug!(task_id, "toggle ignored, task not loaded");
            return Ok(None);
        };
        let patch = TaskPatch::completed(!current.completed);

        let updated = self
            .api
            .update_task(task_id, &patch)
            .with_context(|| format!("failed to toggle task {task_id}"))?;
        self.replace_task(updated.clone());
        Ok(Some(updated))
    }

    #[instrument(skip(self))]
    pub fn delete_task(&mut self, task_id: TaskId) -> anyhow::Result<()> {
        self.api
            .delete_task(task_id)
            .with_context(|| format!("failed to delete task {task_id}"))?;
        self.tasks.retain(|task| task.id != task_id);
        Ok(())
    }

    /// Creates a task in the active list, creating the default list first
    /// when none is active. The new task is prepended locally unless the
    /// refetch already brought it in.
    #[instrument(skip(self, title))]
    pub fn create_task(
        &mut self,
        title: &str,
        priority: Priority,
        due_date: Option<String>,
    ) -> anyhow::Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }

        let list_id = match self.active_list {
            Some(id) => id,
            None => self.create_default_list()?,
        };

        let created = self
            .api
            .create_task(&NewTask {
                title: title.to_string(),
                priority,
                list_id,
                due_date,
            })
            .context("failed to add task")?;
        info!(task_id = created.id, list_id, "created task");

        if !self.tasks.iter().any(|task| task.id == created.id) {
            self.tasks.insert(0, created.clone());
        }
        Ok(created)
    }

    fn create_default_list(&mut self) -> anyhow::Result<ListId> {
        info!("no active list, creating default list");
        let owner_id = self.owner_id()?;
        let list = self
            .api
            .create_list(&NewList {
                name: DEFAULT_LIST_NAME.to_string(),
                emoji: DEFAULT_LIST_EMOJI.to_string(),
                owner_id,
            })
            .context("failed to create default list")?;
        let id = list.id;
        self.lists.insert(0, list);
        self.follow_list(Some(id))?;
        Ok(id)
    }

    /// Marks every task in the active list completed and adopts the server's
    /// full list.
    #[instrument(skip(self))]
    pub fn finish_all(&mut self) -> anyhow::Result<()> {
        let Some(list_id) = self.active_list else {
            debug!("finish-all ignored, no active list");
            return Ok(());
        };
        self.tasks = self
            .api
            .finish_all_tasks(list_id)
            .with_context(|| format!("failed to finish tasks in list {list_id}"))?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn set_priority(&mut self, task_id: TaskId, priority: Priority) -> anyhow::Result<Task> {
        let updated = self
            .api
            .update_task(task_id, &TaskPatch::priority(priority))
            .with_context(|| format!("failed to set priority on task {task_id}"))?;
        self.replace_task(updated.clone());
        Ok(updated)
    }

    fn replace_task(&mut self, updated: Task) {
        if let Some(slot) = self.tasks.iter_mut().find(|task| task.id == updated.id) {
            *slot = updated;
        }
    }

    /// Creates a list, prepends it and makes it active.
    #[instrument(skip(self, name, emoji))]
    pub fn create_list(&mut self, name: &str, emoji: Option<&str>) -> anyhow::Result<TaskList> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyListName.into());
        }
        let emoji = emoji
            .map(str::trim)
            .filter(|emoji| !emoji.is_empty())
            .unwrap_or(NEW_LIST_EMOJI);

        let owner_id = self.owner_id()?;
        let list = self
            .api
            .create_list(&NewList {
                name: name.to_string(),
                emoji: emoji.to_string(),
                owner_id,
            })
            .context("failed to add list")?;
        info!(list_id = list.id, "created list");

        self.lists.insert(0, list.clone());
        self.follow_list(Some(list.id))?;
        Ok(list)
    }

    #[instrument(skip(self, name, emoji))]
    pub fn rename_list(
        &mut self,
        list_id: ListId,
        name: Option<&str>,
        emoji: Option<&str>,
    ) -> anyhow::Result<TaskList> {
        let name = name.map(str::trim);
        if name.is_some_and(str::is_empty) {
            return Err(ValidationError::EmptyListName.into());
        }
        let patch = ListPatch {
            name: name.map(str::to_string),
            emoji: emoji
                .map(str::trim)
                .filter(|emoji| !emoji.is_empty())
                .map(str::to_string),
        };

        let updated = self
            .api
            .update_list(list_id, &patch)
            .with_context(|| format!("failed to update list {list_id}"))?;
        if let Some(slot) = self.lists.iter_mut().find(|list| list.id == list_id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    /// First phase of list deletion: remember the target until confirmed.
    pub fn request_delete_list(&mut self, list_id: ListId) {
        debug!(list_id, "list deletion requested");
        self.delete_prompt.open(list_id);
    }

    pub fn cancel_delete_list(&mut self) {
        if let Some(list_id) = self.delete_prompt.cancel() {
            debug!(list_id, "list deletion cancelled");
        }
    }

    /// Second phase: delete on the server, drop it locally and, if it was
    /// active, fall back to the first remaining list. Returns the deleted id,
    /// or `None` when no deletion was pending.
    #[instrument(skip(self))]
    pub fn confirm_delete_list(&mut self) -> anyhow::Result<Option<ListId>> {
        let api = &self.api;
        let deleted = self.delete_prompt.confirm(|list_id| {
            api.delete_list(*list_id)
                .with_context(|| format!("failed to delete list {list_id}"))
                .map(|()| *list_id)
        })?;
        let Some(list_id) = deleted else {
            return Ok(None);
        };
        info!(list_id, "deleted list");

        self.lists.retain(|list| list.id != list_id);
        if self.active_list == Some(list_id) {
            let next = self.lists.first().map(|list| list.id);
            self.follow_list(next)?;
        }
        Ok(Some(list_id))
    }
}
