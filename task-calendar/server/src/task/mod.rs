use crate::entities::*;
use chrono::{DateTime, Utc};
use sea_orm::*;
use uuid::Uuid;

pub mod api;
mod date;

pub use date::{CalendarDate, ParseCalendarDateError};

/// Longest title the task table accepts.
pub const TITLE_MAX_LEN: usize = 255;

#[derive(Debug, PartialEq, Clone, Eq)]
pub struct Task {
    id: Uuid,
    title: String,
    description: String,
    date: CalendarDate,
    completed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Returns the ID of the task.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the calendar day the task belongs to.
    pub fn date(&self) -> CalendarDate {
        self.date
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl From<task::Model> for Task {
    fn from(model: task::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            date: CalendarDate::from(model.date),
            completed: model.completed,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Input for creating a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub date: CalendarDate,
}

/// Complete replacement state for an existing task.
#[derive(Debug, Clone)]
pub struct TaskChanges {
    pub title: String,
    pub description: String,
    pub date: CalendarDate,
    pub completed: bool,
}

/// Error type for TaskRepository operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskRepositoryError {
    /// Represents input that was rejected before reaching the database.
    #[error("Validation failed: {0}")]
    Validation(String),
    /// Represents a task not found error.
    #[error("Task with ID {0} not found")]
    NotFound(Uuid),
    /// Represents a database error.
    #[error("Database error: {0}")]
    Storage(#[from] DbErr),
}

pub struct TaskRepository<'a> {
    db: &'a DatabaseConnection,
}

impl TaskRepository<'_> {
    pub fn new(db: &DatabaseConnection) -> TaskRepository<'_> {
        TaskRepository { db }
    }

    /// Retrieves every task, newest day first, newest task first within a day.
    #[tracing::instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Task>, TaskRepositoryError> {
        let tasks = task::Entity::find()
            .order_by_desc(task::Column::Date)
            .order_by_desc(task::Column::CreatedAt)
            .all(self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }

    /// Retrieves the tasks of a single day, newest first.
    ///
    /// An empty vector is returned when the day has no tasks.
    #[tracing::instrument(skip(self))]
    pub async fn list_by_date(
        &self,
        date: CalendarDate,
    ) -> Result<Vec<Task>, TaskRepositoryError> {
        let tasks = task::Entity::find()
            .filter(task::Column::Date.eq(chrono::NaiveDate::from(date)))
            .order_by_desc(task::Column::CreatedAt)
            .all(self.db)
            .await?
            .into_iter()
            .map(Task::from)
            .collect();
        Ok(tasks)
    }

    /// Retrieves a task by its ID.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<Task, TaskRepositoryError> {
        let model = task::Entity::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or(TaskRepositoryError::NotFound(id))?;
        Ok(Task::from(model))
    }

    /// Creates a new, uncompleted task.
    ///
    /// # Arguments
    ///
    /// * `new_task` - Title, optional description and day of the task.
    ///
    /// # Returns
    ///
    /// The stored `Task`, or a `Validation` error when the title is blank or too long.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, new_task: NewTask) -> Result<Task, TaskRepositoryError> {
        validate_title(&new_task.title)?;

        let now = Utc::now();
        let active_model = task::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            title: ActiveValue::Set(new_task.title),
            description: ActiveValue::Set(new_task.description.unwrap_or_default()),
            date: ActiveValue::Set(new_task.date.into()),
            completed: ActiveValue::Set(false),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        let created_model = active_model.insert(self.db).await?;
        tracing::info!("Created task {}", created_model.id);
        Ok(Task::from(created_model))
    }

    /// Replaces every mutable field of a task and refreshes its update time.
    ///
    /// # Arguments
    ///
    /// * `id` - The ID of the task to update.
    /// * `changes` - The complete desired state of the task.
    ///
    /// # Returns
    ///
    /// The updated `Task`, or `NotFound` when no task has this ID.
    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        changes: TaskChanges,
    ) -> Result<Task, TaskRepositoryError> {
        validate_title(&changes.title)?;

        let active_model = task::ActiveModel {
            id: ActiveValue::Unchanged(id),
            title: ActiveValue::Set(changes.title),
            description: ActiveValue::Set(changes.description),
            date: ActiveValue::Set(changes.date.into()),
            completed: ActiveValue::Set(changes.completed),
            created_at: ActiveValue::NotSet,
            updated_at: ActiveValue::Set(Utc::now()),
        };

        match active_model.update(self.db).await {
            Ok(updated_model) => Ok(Task::from(updated_model)),
            Err(DbErr::RecordNotUpdated) => Err(TaskRepositoryError::NotFound(id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes a task by its ID in a single `DELETE ... RETURNING` statement.
    ///
    /// # Returns
    ///
    /// The deleted `Task`, or `NotFound` when no task has this ID.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<Task, TaskRepositoryError> {
        let deleted_model = task::Entity::delete_by_id(id)
            .exec_with_returning(self.db)
            .await?
            .into_iter()
            .next()
            .ok_or(TaskRepositoryError::NotFound(id))?;
        tracing::info!("Deleted task {}", id);
        Ok(Task::from(deleted_model))
    }
}

fn validate_title(title: &str) -> Result<(), TaskRepositoryError> {
    if title.trim().is_empty() {
        return Err(TaskRepositoryError::Validation(
            "Title must not be empty".to_string(),
        ));
    }
    if title.chars().count() > TITLE_MAX_LEN {
        return Err(TaskRepositoryError::Validation(format!(
            "Title must be at most {} characters",
            TITLE_MAX_LEN
        )));
    }
    Ok(())
}
