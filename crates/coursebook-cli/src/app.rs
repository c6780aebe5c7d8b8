//! Command handlers. `App` owns the configuration, the shared session and
//! the API client built on top of it.

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail, Context, Result};
use tracing::{debug, info, warn};

use coursebook_core::config::Config;
use coursebook_core::courses::{
    CourseForm, CourseList, DeleteOutcome, SubmitOutcome,
};
use coursebook_core::models::{ProfileUpdate, RegisterRequest, Role};
use coursebook_core::{ApiClient, ApiError, SessionStore};

use crate::render;
use crate::CourseFields;

/// Environment variable holding the password for non-interactive use
const PASSWORD_ENV: &str = "COURSEBOOK_PASSWORD";

pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";
const NOT_LOGGED_IN_MESSAGE: &str = "Not logged in. Run `coursebook login` first.";

pub struct App {
    config: Config,
    api: ApiClient,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let backend = config
            .session_backend()
            .context("Failed to open session storage")?;
        let session = SessionStore::open(backend);
        debug!(authenticated = session.is_authenticated(), "Session restored");

        let api = ApiClient::from_config(&config, session).context("Failed to create API client")?;
        Ok(Self { config, api })
    }

    /// Post-process a command's result. A rejected token means the stored
    /// session is useless: forget it and ask for a fresh login.
    pub fn finish(&self, result: Result<()>) -> Result<()> {
        let Err(e) = result else {
            return Ok(());
        };
        match e.downcast_ref::<ApiError>() {
            Some(api_err) if api_err.is_unauthorized() => {
                warn!("Access token rejected, clearing session");
                self.api.logout();
                Err(anyhow!(SESSION_EXPIRED_MESSAGE))
            }
            _ => Err(e),
        }
    }

    fn require_login(&self) -> Result<()> {
        if self.api.session().is_authenticated() {
            Ok(())
        } else {
            Err(anyhow!(NOT_LOGGED_IN_MESSAGE))
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub async fn login(&mut self, username: Option<String>) -> Result<()> {
        let username = match username {
            Some(username) => username,
            None => self.prompt_username()?,
        };
        if username.is_empty() {
            bail!("Username is required");
        }
        let password = Self::password("Password: ")?;

        let response = self
            .api
            .login(&username, &password)
            .await
            .map_err(|e| anyhow!(login_error_message(&e)))?;

        self.remember_username(username);
        println!(
            "Logged in as {} ({})",
            response.user.display_name(),
            response.user.role
        );
        Ok(())
    }

    pub async fn register(
        &mut self,
        username: String,
        email: String,
        first_name: Option<String>,
        last_name: Option<String>,
        role: Option<Role>,
    ) -> Result<()> {
        let password = Self::password("Password: ")?;
        if std::env::var(PASSWORD_ENV).is_err() {
            let confirm = rpassword::prompt_password("Confirm password: ")?;
            if confirm != password {
                bail!("Passwords do not match");
            }
        }

        let request = RegisterRequest {
            username: username.clone(),
            email,
            password,
            first_name,
            last_name,
            role,
        };
        let response = self.api.register(&request).await.map_err(|e| {
            warn!(error = %e, "Registration failed");
            anyhow!(e.user_message("Registration failed. Please try again."))
        })?;

        self.remember_username(username);
        println!("Account created. Logged in as {}", response.user.display_name());
        Ok(())
    }

    pub fn logout(&self) {
        self.api.logout();
        println!("Logged out");
    }

    pub fn whoami(&self) {
        match self.api.session().current() {
            Some(profile) => print!("{}", render::profile(&profile)),
            None => println!("Not logged in"),
        }
    }

    fn remember_username(&mut self, username: String) {
        self.config.last_username = Some(username);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    fn prompt_username(&self) -> Result<String> {
        match self.config.last_username {
            Some(ref last) => print!("Username [{}]: ", last),
            None => print!("Username: "),
        }
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        let input = input.trim();

        if input.is_empty() {
            Ok(self.config.last_username.clone().unwrap_or_default())
        } else {
            Ok(input.to_string())
        }
    }

    fn password(prompt: &str) -> Result<String> {
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            debug!("Using password from environment");
            return Ok(password);
        }
        rpassword::prompt_password(prompt).context("Failed to read password")
    }

    // =========================================================================
    // Profile and password reset
    // =========================================================================

    pub async fn show_profile(&self) -> Result<()> {
        self.require_login()?;
        let profile = self.api.get_profile().await?;
        print!("{}", render::profile(&profile));
        Ok(())
    }

    pub async fn update_profile(
        &self,
        email: Option<String>,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<()> {
        self.require_login()?;
        let update = ProfileUpdate {
            email,
            first_name,
            last_name,
        };
        if update.is_empty() {
            bail!("Nothing to update. Pass --email, --first-name or --last-name.");
        }

        let profile = self
            .api
            .update_profile(&update)
            .await
            .map_err(|e| reported(e, "Failed to update profile. Please try again."))?;
        println!("Profile updated");
        print!("{}", render::profile(&profile));
        Ok(())
    }

    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let ack = self
            .api
            .forgot_password(email)
            .await
            .map_err(|e| reported(e, "Failed to request a password reset. Please try again."))?;
        println!(
            "{}",
            ack.message.unwrap_or_else(|| {
                "If an account exists for that email, a reset link has been sent.".to_string()
            })
        );
        Ok(())
    }

    pub async fn reset_password(&self, token: &str) -> Result<()> {
        let password = Self::password("New password: ")?;
        let ack = self
            .api
            .reset_password(token, &password)
            .await
            .map_err(|e| reported(e, "Failed to reset password. Please try again."))?;
        println!(
            "{}",
            ack.message
                .unwrap_or_else(|| "Password has been reset. You can now log in.".to_string())
        );
        Ok(())
    }

    // =========================================================================
    // Courses
    // =========================================================================

    pub async fn list_categories(&self) -> Result<()> {
        let categories = self
            .api
            .fetch_categories()
            .await
            .map_err(|e| reported(e, "Failed to load categories."))?;
        print!("{}", render::categories(&categories));
        Ok(())
    }

    pub async fn list_courses(&self) -> Result<()> {
        self.require_login()?;
        let mut list = CourseList::new(self.api.clone());
        if let Err(e) = list.fetch().await {
            if e.is_unauthorized() {
                return Err(e.into());
            }
            bail!("{}", list.error().unwrap_or_default());
        }
        print!("{}", render::course_table(list.scope(), list.courses()));
        Ok(())
    }

    pub async fn show_course(&self, id: i64) -> Result<()> {
        self.require_login()?;
        let course = self
            .api
            .fetch_course(id)
            .await
            .map_err(|e| reported(e, "Failed to load course. Please try again."))?;
        print!("{}", render::course_detail(&course));
        Ok(())
    }

    /// Create (`id` is `None`) or edit a course through the course form.
    pub async fn save_course(&self, id: Option<i64>, fields: CourseFields) -> Result<()> {
        self.require_login()?;
        let mut form = match id {
            Some(id) => CourseForm::edit(self.api.clone(), id),
            None => CourseForm::create(self.api.clone()),
        };

        if let Err(e) = form.load().await {
            if e.is_unauthorized() {
                return Err(e.into());
            }
            // Only a missing course is fatal; categories are optional
            if let Some(message) = form.error() {
                bail!("{}", message);
            }
        }

        let published = fields.published();
        form.update(|draft| {
            if let Some(title) = fields.title {
                draft.title = title;
            }
            if let Some(description) = fields.description {
                draft.description = description;
            }
            if let Some(category) = fields.category {
                draft.category = Some(category);
            }
            if let Some(hours) = fields.hours {
                draft.duration_hours = hours;
            }
            if let Some(published) = published {
                draft.is_published = published;
            }
        });

        match form.submit().await {
            SubmitOutcome::Saved(course) => {
                info!(course_id = course.id, "Course saved");
                println!("{}: saved course #{}", form.title(), course.id);
                print!("{}", render::course_detail(&course));
                Ok(())
            }
            SubmitOutcome::Invalid => {
                eprint!("{}", render::field_errors(form.field_errors()));
                bail!("{}", form.error().unwrap_or_default())
            }
            SubmitOutcome::Failed(e) if e.is_unauthorized() => Err(e.into()),
            SubmitOutcome::Failed(_) => bail!("{}", form.error().unwrap_or_default()),
            SubmitOutcome::NotReady => bail!("The course form is not ready"),
        }
    }

    pub async fn delete_course(&self, id: i64, skip_confirm: bool) -> Result<()> {
        self.require_login()?;
        let mut list = CourseList::new(self.api.clone());
        let mut confirm = |prompt: &str| skip_confirm || ask_yes_no(prompt);

        match list.delete(id, &mut confirm).await {
            DeleteOutcome::Cancelled => {
                println!("Cancelled");
                Ok(())
            }
            DeleteOutcome::Deleted => {
                println!("Deleted course #{}", id);
                Ok(())
            }
            DeleteOutcome::Failed(e) if e.is_unauthorized() => Err(e.into()),
            DeleteOutcome::Failed(_) => bail!("{}", list.delete_error().unwrap_or_default()),
        }
    }
}

/// Turn a backend error into the message shown to the user, keeping
/// `Unauthorized` intact so `App::finish` can react to it.
fn reported(e: ApiError, fallback: &str) -> anyhow::Error {
    if e.is_unauthorized() {
        e.into()
    } else {
        warn!(error = %e, "Request failed");
        anyhow!(e.user_message(fallback))
    }
}

fn login_error_message(e: &ApiError) -> String {
    match e {
        ApiError::Unauthorized(_) => "Invalid username or password".to_string(),
        ApiError::NetworkError(err) if err.is_timeout() => {
            "Connection timed out. Please try again.".to_string()
        }
        ApiError::NetworkError(_) => {
            "Unable to connect to server. Check your internet connection.".to_string()
        }
        other => other.user_message("Login failed. Please try again."),
    }
}

fn ask_yes_no(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut input = String::new();
    if io::stdin().lock().read_line(&mut input).is_err() {
        return false;
    }
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}
