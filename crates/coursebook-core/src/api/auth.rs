//! Account endpoints: login, registration, profile and password reset.

use tracing::info;

use crate::auth::SessionData;
use crate::models::auth::{ForgotPasswordRequest, ResetPasswordRequest};
use crate::models::{AuthResponse, LoginRequest, MessageResponse, Profile, ProfileUpdate, RegisterRequest};

use super::client::{ApiClient, ApiResult};

const REGISTER_PATH: &str = "/auth/register/";
const LOGIN_PATH: &str = "/auth/login/";
const PROFILE_PATH: &str = "/auth/profile/";
const FORGOT_PASSWORD_PATH: &str = "/auth/forgot-password/";
const RESET_PASSWORD_PATH: &str = "/auth/reset-password/";

impl ApiClient {
    /// Create an account and sign in as it.
    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthResponse> {
        let response: AuthResponse = self.post_anonymous(REGISTER_PATH, request).await?;
        self.store_session(&response);
        info!(user_id = response.user.id, "Registration successful");
        Ok(response)
    }

    /// Exchange credentials for tokens and store them in the session.
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<AuthResponse> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response: AuthResponse = self.post_anonymous(LOGIN_PATH, &request).await?;
        self.store_session(&response);
        info!(user_id = response.user.id, role = %response.user.role, "Login successful");
        Ok(response)
    }

    /// Forget the local session. The backend is not contacted.
    pub fn logout(&self) {
        self.session().clear();
        info!("Logged out");
    }

    pub async fn get_profile(&self) -> ApiResult<Profile> {
        self.get(PROFILE_PATH).await
    }

    /// Save profile edits. The returned profile replaces the stored user;
    /// tokens are left alone.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<Profile> {
        let profile: Profile = self.put(PROFILE_PATH, update).await?;
        self.session().update_user(profile.clone());
        Ok(profile)
    }

    pub async fn forgot_password(&self, email: &str) -> ApiResult<MessageResponse> {
        self.post_anonymous_ack(FORGOT_PASSWORD_PATH, &ForgotPasswordRequest { email })
            .await
    }

    pub async fn reset_password(&self, token: &str, password: &str) -> ApiResult<MessageResponse> {
        self.post_anonymous_ack(RESET_PASSWORD_PATH, &ResetPasswordRequest { token, password })
            .await
    }

    fn store_session(&self, response: &AuthResponse) {
        self.session().save(SessionData::new(
            response.access.clone(),
            Some(response.refresh.clone()),
            response.user.clone(),
        ));
    }
}
