#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeSet;

use bettertasks_core::api::{ApiResult, TaskApi};
use bettertasks_core::error::ApiError;
use bettertasks_core::model::{
    ListId, ListPatch, LoginRequest, NewList, NewTask, Priority, RegisterRequest, Task, TaskId,
    TaskList, TaskPatch, User, UserId,
};

/// In-memory stand-in for the REST backend. Every call is recorded by label;
/// labels listed in `failing` answer with HTTP 500.
#[derive(Debug, Default)]
pub struct Backend {
    pub users: Vec<User>,
    pub lists: Vec<TaskList>,
    pub tasks: Vec<Task>,
    pub calls: Vec<&'static str>,
    pub failing: BTreeSet<&'static str>,
    /// Suffix the server appends to titles on update, so tests can tell a
    /// server response from a local guess.
    pub update_stamp: Option<String>,
    next_id: u64,
}

#[derive(Debug, Default)]
pub struct FakeApi {
    pub backend: RefCell<Backend>,
}

impl FakeApi {
    pub fn new() -> Self {
        let api = Self::default();
        api.backend.borrow_mut().next_id = 100;
        api
    }

    pub fn with_user(self, id: UserId, name: &str) -> Self {
        self.backend.borrow_mut().users.push(User {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_ascii_lowercase()),
            avatar_url: None,
            created_at: None,
        });
        self
    }

    pub fn seed_list(&self, owner_id: UserId, name: &str) -> ListId {
        let mut backend = self.backend.borrow_mut();
        let id = backend.bump();
        backend.lists.push(TaskList {
            id,
            name: name.to_string(),
            emoji: "📋".to_string(),
            owner_id,
            created_at: None,
        });
        id
    }

    pub fn seed_task(&self, list_id: ListId, title: &str, completed: bool) -> TaskId {
        let mut backend = self.backend.borrow_mut();
        let id = backend.bump();
        backend.tasks.push(Task {
            id,
            title: title.to_string(),
            priority: Priority::Medium,
            completed,
            due_date: None,
            list_id,
            created_at: "2026-02-17T12:00:00".to_string(),
        });
        id
    }

    pub fn fail(&self, label: &'static str) {
        self.backend.borrow_mut().failing.insert(label);
    }

    pub fn heal(&self, label: &'static str) {
        self.backend.borrow_mut().failing.remove(label);
    }

    pub fn calls(&self, label: &str) -> usize {
        self.backend
            .borrow()
            .calls
            .iter()
            .filter(|call| **call == label)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.backend.borrow().calls.len()
    }

    pub fn server_task(&self, id: TaskId) -> Option<Task> {
        self.backend
            .borrow()
            .tasks
            .iter()
            .find(|task| task.id == id)
            .cloned()
    }

    pub fn lists_owned_by(&self, owner_id: UserId) -> Vec<TaskList> {
        self.backend
            .borrow()
            .lists
            .iter()
            .filter(|list| list.owner_id == owner_id)
            .cloned()
            .collect()
    }

    fn enter(&self, label: &'static str) -> ApiResult<std::cell::RefMut<'_, Backend>> {
        let mut backend = self.backend.borrow_mut();
        backend.calls.push(label);
        if backend.failing.contains(label) {
            return Err(ApiError::Status {
                label,
                status: 500,
                detail: Some(format!("{label} is unavailable")),
            });
        }
        Ok(backend)
    }
}

impl Backend {
    fn bump(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

fn not_found(label: &'static str, what: &str) -> ApiError {
    ApiError::Status {
        label,
        status: 404,
        detail: Some(format!("{what} not found")),
    }
}

impl TaskApi for FakeApi {
    fn register(&self, payload: &RegisterRequest) -> ApiResult<User> {
        let mut backend = self.enter("register")?;
        if backend.users.iter().any(|user| user.email == payload.email) {
            return Err(ApiError::Status {
                label: "register",
                status: 400,
                detail: Some("Email already registered".to_string()),
            });
        }
        let user = User {
            id: backend.bump(),
            name: payload.name.clone(),
            email: payload.email.clone(),
            avatar_url: None,
            created_at: None,
        };
        backend.users.push(user.clone());
        Ok(user)
    }

    fn login(&self, payload: &LoginRequest) -> ApiResult<User> {
        let backend = self.enter("login")?;
        backend
            .users
            .iter()
            .find(|user| user.email == payload.email)
            .cloned()
            .ok_or(ApiError::Status {
                label: "login",
                status: 401,
                detail: Some("Invalid email or password".to_string()),
            })
    }

    fn get_user(&self, user_id: UserId) -> ApiResult<User> {
        let backend = self.enter("get_user")?;
        backend
            .users
            .iter()
            .find(|user| user.id == user_id)
            .cloned()
            .ok_or_else(|| not_found("get user", "User"))
    }

    fn get_tasks(&self, list_id: ListId) -> ApiResult<Vec<Task>> {
        let backend = self.enter("get_tasks")?;
        Ok(backend
            .tasks
            .iter()
            .filter(|task| task.list_id == list_id)
            .cloned()
            .collect())
    }

    fn create_task(&self, task: &NewTask) -> ApiResult<Task> {
        let mut backend = self.enter("create_task")?;
        if !backend.lists.iter().any(|list| list.id == task.list_id) {
            return Err(not_found("create task", "List"));
        }
        let created = Task {
            id: backend.bump(),
            title: task.title.clone(),
            priority: task.priority,
            completed: false,
            due_date: task.due_date.clone(),
            list_id: task.list_id,
            created_at: "2026-02-17T12:00:00".to_string(),
        };
        backend.tasks.push(created.clone());
        Ok(created)
    }

    fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> ApiResult<Task> {
        let mut backend = self.enter("update_task")?;
        let stamp = backend.update_stamp.clone();
        let task = backend
            .tasks
            .iter_mut()
            .find(|task| task.id == task_id)
            .ok_or_else(|| not_found("update task", "Task"))?;
        if let Some(title) = patch.title.as_ref() {
            task.title = title.clone();
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(completed) = patch.completed {
            task.completed = completed;
        }
        if let Some(due) = patch.due_date.as_ref() {
            task.due_date = Some(due.clone());
        }
        if let Some(stamp) = stamp {
            task.title.push_str(&stamp);
        }
        Ok(task.clone())
    }

    fn delete_task(&self, task_id: TaskId) -> ApiResult<()> {
        let mut backend = self.enter("delete_task")?;
        let before = backend.tasks.len();
        backend.tasks.retain(|task| task.id != task_id);
        if backend.tasks.len() == before {
            return Err(not_found("delete task", "Task"));
        }
        Ok(())
    }

    fn finish_all_tasks(&self, list_id: ListId) -> ApiResult<Vec<Task>> {
        let mut backend = self.enter("finish_all_tasks")?;
        let mut out = Vec::new();
        for task in backend.tasks.iter_mut().filter(|task| task.list_id == list_id) {
            task.completed = true;
            out.push(task.clone());
        }
        Ok(out)
    }

    fn get_lists(&self, owner_id: UserId) -> ApiResult<Vec<TaskList>> {
        let backend = self.enter("get_lists")?;
        Ok(backend
            .lists
            .iter()
            .filter(|list| list.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn create_list(&self, list: &NewList) -> ApiResult<TaskList> {
        let mut backend = self.enter("create_list")?;
        if !backend.users.iter().any(|user| user.id == list.owner_id) {
            return Err(not_found("create list", "User"));
        }
        let created = TaskList {
            id: backend.bump(),
            name: list.name.clone(),
            emoji: list.emoji.clone(),
            owner_id: list.owner_id,
            created_at: None,
        };
        backend.lists.push(created.clone());
        Ok(created)
    }

    fn update_list(&self, list_id: ListId, patch: &ListPatch) -> ApiResult<TaskList> {
        let mut backend = self.enter("update_list")?;
        let list = backend
            .lists
            .iter_mut()
            .find(|list| list.id == list_id)
            .ok_or_else(|| not_found("update list", "List"))?;
        if let Some(name) = patch.name.as_ref() {
            list.name = name.clone();
        }
        if let Some(emoji) = patch.emoji.as_ref() {
            list.emoji = emoji.clone();
        }
        Ok(list.clone())
    }

    fn delete_list(&self, list_id: ListId) -> ApiResult<()> {
        let mut backend = self.enter("delete_list")?;
        let before = backend.lists.len();
        backend.lists.retain(|list| list.id != list_id);
        if backend.lists.len() == before {
            return Err(not_found("delete list", "List"));
        }
        backend.tasks.retain(|task| task.list_id != list_id);
        Ok(())
    }
}
