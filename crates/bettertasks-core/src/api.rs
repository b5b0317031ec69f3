//! Typed access to the BetterTasks REST resources.
//!
//! [`TaskApi`] is the seam the view-state controller talks through;
//! [`HttpApi`] is the blocking reqwest implementation used by the CLI.

use crate::error::ApiError;
use crate::model::{
    ListId, ListPatch, LoginRequest, NewList, NewTask, RegisterRequest, Task, TaskId, TaskList,
    TaskPatch, User, UserId,
};

mod http;

pub use self::http::{HttpApi, error_detail};

pub type ApiResult<T> = Result<T, ApiError>;

/// One method per resource operation. Every call either returns the decoded
/// resource or an [`ApiError`]; nothing is retried.
pub trait TaskApi {
    fn register(&self, payload: &RegisterRequest) -> ApiResult<User>;
    fn login(&self, payload: &LoginRequest) -> ApiResult<User>;

    fn get_user(&self, user_id: UserId) -> ApiResult<User>;

    fn get_tasks(&self, list_id: ListId) -> ApiResult<Vec<Task>>;
    fn create_task(&self, task: &NewTask) -> ApiResult<Task>;
    fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> ApiResult<Task>;
    fn delete_task(&self, task_id: TaskId) -> ApiResult<()>;
    fn finish_all_tasks(&self, list_id: ListId) -> ApiResult<Vec<Task>>;

    fn get_lists(&self, owner_id: UserId) -> ApiResult<Vec<TaskList>>;
    fn create_list(&self, list: &NewList) -> ApiResult<TaskList>;
    fn update_list(&self, list_id: ListId, patch: &ListPatch) -> ApiResult<TaskList>;
    fn delete_list(&self, list_id: ListId) -> ApiResult<()>;
}

impl<A: TaskApi + ?Sized> TaskApi for &A {
    fn register(&self, payload: &RegisterRequest) -> ApiResult<User> {
        (**self).register(payload)
    }

    fn login(&self, payload: &LoginRequest) -> ApiResult<User> {
        (**self).login(payload)
    }

    fn get_user(&self, user_id: UserId) -> ApiResult<User> {
        (**self).get_user(user_id)
    }

    fn get_tasks(&self, list_id: ListId) -> ApiResult<Vec<Task>> {
        (**self).get_tasks(list_id)
    }

    fn create_task(&self, task: &NewTask) -> ApiResult<Task> {
        (**self).create_task(task)
    }

    fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> ApiResult<Task> {
        (**self).update_task(task_id, patch)
    }

    fn delete_task(&self, task_id: TaskId) -> ApiResult<()> {
        (**self).delete_task(task_id)
    }

    fn finish_all_tasks(&self, list_id: ListId) -> ApiResult<Vec<Task>> {
        (**self).finish_all_tasks(list_id)
    }

    fn get_lists(&self, owner_id: UserId) -> ApiResult<Vec<TaskList>> {
        (**self).get_lists(owner_id)
    }

    fn create_list(&self, list: &NewList) -> ApiResult<TaskList> {
        (**self).create_list(list)
    }

    fn update_list(&self, list_id: ListId, patch: &ListPatch) -> ApiResult<TaskList> {
        (**self).update_list(list_id, patch)
    }

    fn delete_list(&self, list_id: ListId) -> ApiResult<()> {
        (**self).delete_list(list_id)
    }
}
