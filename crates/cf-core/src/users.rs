//! # Accounts
//!
//! Registration with an emailed confirmation code, login, profile edits and
//! user lookup.

use std::str::FromStr;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::models::{Notification, RegistrationStatus, User, UserId};
use crate::retry::RetryPolicy;
use crate::traits::{AuthProvider, Mailer, UserRepo};
use crate::validation::{Validate, ValidationErrors, Validator};

const MIN_NAME_LEN: usize = 5;
const MIN_EMAIL_LEN: usize = 5;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub desired_name: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub continent: Option<String>,
    pub hobbies: Vec<String>,
}

impl Validate for RegisterInput {
    fn validate(&self) -> Result<()> {
        Validator::new()
            .required("name", &self.name)
            .min_len("name", &self.name, MIN_NAME_LEN)
            .required("email", &self.email)
            .min_len("email", &self.email, MIN_EMAIL_LEN)
            .email("email", &self.email)
            .required("password", &self.password)
            .min_len("password", &self.password, MIN_PASSWORD_LEN)
            .not_blank("desired_name", self.desired_name.as_deref())
            .not_blank("gender", self.gender.as_deref())
            .not_blank("phone", self.phone.as_deref())
            .not_blank("city", self.city.as_deref())
            .not_blank("country", self.country.as_deref())
            .not_blank("continent", self.continent.as_deref())
            .check(
                "hobbies",
                self.hobbies.iter().all(|h| !h.trim().is_empty()),
                "'hobbies' cannot contain empty entries",
            )
            .finish()
    }
}

/// Optional profile fields; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub desired_name: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub continent: Option<String>,
    pub hobbies: Option<Vec<String>>,
}

impl Validate for ProfileUpdate {
    fn validate(&self) -> Result<()> {
        let hobbies_ok = self
            .hobbies
            .as_ref()
            .map_or(true, |hobbies| hobbies.iter().all(|h| !h.trim().is_empty()));
        Validator::new()
            .not_blank("desired_name", self.desired_name.as_deref())
            .not_blank("gender", self.gender.as_deref())
            .not_blank("phone", self.phone.as_deref())
            .not_blank("city", self.city.as_deref())
            .not_blank("country", self.country.as_deref())
            .not_blank("continent", self.continent.as_deref())
            .check("hobbies", hobbies_ok, "'hobbies' cannot contain empty entries")
            .finish()
    }
}

impl ProfileUpdate {
    fn apply(&self, user: &mut User) {
        let fields = [
            (&self.desired_name, &mut user.desired_name),
            (&self.gender, &mut user.gender),
            (&self.phone, &mut user.phone),
            (&self.city, &mut user.city),
            (&self.country, &mut user.country),
            (&self.continent, &mut user.continent),
        ];
        for (update, slot) in fields {
            if let Some(value) = update {
                *slot = Some(value.trim().to_string());
            }
        }
        if let Some(hobbies) = &self.hobbies {
            user.hobbies = hobbies.iter().map(|h| h.trim().to_string()).collect();
        }
    }
}

/// Fields `find_by_field` can search on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    /// Case-insensitive substring
    Name,
    /// Case-insensitive equality
    Email,
    /// Exact equality
    Phone,
}

impl FromStr for UserField {
    type Err = AppError;

    fn from_str(field: &str) -> Result<Self> {
        match field {
            "name" => Ok(UserField::Name),
            "email" => Ok(UserField::Email),
            "phone" => Ok(UserField::Phone),
            other => Err(ValidationErrors::single(other, format!("'{other}' does not exist in schema")).into()),
        }
    }
}

impl UserField {
    pub fn matches(&self, user: &User, value: &str) -> bool {
        match self {
            UserField::Name => user.name.to_lowercase().contains(&value.to_lowercase()),
            UserField::Email => user.email.eq_ignore_ascii_case(value),
            UserField::Phone => user.phone.as_deref() == Some(value),
        }
    }
}

pub struct AccountService {
    users: Arc<dyn UserRepo>,
    auth: Arc<dyn AuthProvider>,
    mailer: Arc<dyn Mailer>,
    retry: RetryPolicy,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        auth: Arc<dyn AuthProvider>,
        mailer: Arc<dyn Mailer>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            users,
            auth,
            mailer,
            retry,
        }
    }

    async fn load(&self, id: UserId) -> Result<User> {
        self.users
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))
    }

    async fn save(&self, user: User) -> Result<User> {
        self.users
            .save_users(vec![user])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("store returned no documents".into()))
    }

    /// Creates an inactive account and mails its confirmation code.
    #[tracing::instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<User> {
        input.validate()?;

        let hash = self.auth.hash_password(&input.password).await?;
        let code = self.auth.generate_confirmation_code()?;

        let mut user = User::new(input.name.trim().to_string(), input.email.trim().to_lowercase(), hash);
        ProfileUpdate {
            desired_name: input.desired_name,
            gender: input.gender,
            phone: input.phone,
            city: input.city,
            country: input.country,
            continent: input.continent,
            hobbies: Some(input.hobbies),
        }
        .apply(&mut user);
        user.confirmation_code = Some(code.clone());

        let user = self.users.insert_user(user).await?;
        self.mailer
            .send_confirmation_code(&user.name, &user.email, &code)
            .await?;
        info!(user = %user.id, "registered, awaiting confirmation");
        Ok(user)
    }

    /// Activates the account whose emailed code matches.
    #[tracing::instrument(skip(self, code))]
    pub async fn confirm(&self, email: &str, code: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        let email = &email;
        let user = self
            .retry
            .run(move || async move {
                let mut user = self
                    .users
                    .find_by_email(email)
                    .await?
                    .ok_or_else(|| AppError::not_found("User", email))?;
                if user.is_active() {
                    return Err(ValidationErrors::single("code", "account is already confirmed").into());
                }
                if user.confirmation_code.as_deref() != Some(code.trim()) {
                    return Err(ValidationErrors::single("code", "invalid confirmation code").into());
                }
                user.status = RegistrationStatus::Active;
                user.confirmation_code = None;
                self.save(user).await
            })
            .await?;

        info!(user = %user.id, "account confirmed");
        // the account is active either way
        if let Err(err) = self.mailer.send_welcome(&user.name, &user.email).await {
            warn!(user = %user.id, error = %err, "welcome mail not sent");
        }
        Ok(user)
    }

    /// Issues a fresh code for an inactive account and mails it again.
    #[tracing::instrument(skip(self))]
    pub async fn resend_code(&self, email: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        let code = self.auth.generate_confirmation_code()?;
        let (email, code) = (&email, &code);
        let user = self
            .retry
            .run(move || async move {
                let mut user = self
                    .users
                    .find_by_email(email)
                    .await?
                    .ok_or_else(|| AppError::not_found("User", email))?;
                if user.is_active() {
                    return Err(ValidationErrors::single("email", "account is already confirmed").into());
                }
                user.confirmation_code = Some(code.clone());
                self.save(user).await
            })
            .await?;

        self.mailer
            .send_confirmation_code(&user.name, &user.email, code)
            .await?;
        info!(user = %user.id, "confirmation code re-sent");
        Ok(user)
    }

    /// Returns a bearer token for an active account.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<(String, User)> {
        let invalid = || AppError::Unauthorized("invalid email or password".into());

        let user = self
            .users
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(invalid)?;
        if !self.auth.verify_password(password, &user.password_hash).await {
            return Err(invalid());
        }
        if !user.is_active() {
            return Err(AppError::Unauthorized("account has not been confirmed".into()));
        }

        let token = self.auth.issue_token(user.id)?;
        Ok((token, user))
    }

    pub async fn me(&self, caller: UserId) -> Result<User> {
        self.load(caller).await
    }

    pub async fn all_users(&self) -> Result<Vec<User>> {
        self.users.list_users().await
    }

    pub async fn find_by_field(&self, field: &str, value: &str) -> Result<Vec<User>> {
        let field: UserField = field.parse()?;
        let users = self.users.list_users().await?;
        Ok(users.into_iter().filter(|user| field.matches(user, value)).collect())
    }

    #[tracing::instrument(skip(self, update))]
    pub async fn update_profile(&self, caller: UserId, update: ProfileUpdate) -> Result<User> {
        update.validate()?;
        let update = &update;
        self.retry
            .run(move || async move {
                let mut me = self.load(caller).await?;
                update.apply(&mut me);
                self.save(me).await
            })
            .await
    }

    pub async fn notifications(&self, caller: UserId) -> Result<Vec<Notification>> {
        Ok(self.load(caller).await?.notifications)
    }

    pub async fn clear_notifications(&self, caller: UserId) -> Result<User> {
        self.retry
            .run(move || async move {
                let mut me = self.load(caller).await?;
                me.notifications.clear();
                self.save(me).await
            })
            .await
    }
}
