use crate::domain::error::DomainError;
use crate::domain::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Pagination};
use crate::domain::user::NewUser;
use serde::Deserialize;

// ======================= USERS =======================

/// Body of `POST /users` and `PUT /users/{id}`. Unknown fields (such as a
/// client-sent `id`) are ignored.
#[derive(Debug, Deserialize)]
pub struct UserPayload {
    pub name: String,
    pub email: String,
}

impl UserPayload {
    pub fn validate(self) -> Result<NewUser, DomainError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DomainError::BadRequest("name cannot be empty".into()));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::BadRequest("email is invalid".into()));
        }
        Ok(NewUser::new(name, email))
    }
}

// ======================= POSTS =======================

#[derive(Debug, Deserialize)]
pub struct ListPostsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
}

impl ListPostsQuery {
    pub fn pagination(&self) -> Result<Pagination, DomainError> {
        if self.page == 0 {
            return Err(DomainError::BadRequest("page must be at least 1".into()));
        }
        if self.size == 0 || self.size > MAX_PAGE_SIZE {
            return Err(DomainError::BadRequest(format!(
                "size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(Pagination::new(self.page, self.size))
    }
}

// ======================= Utils =======================
fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(name: &str, email: &str) -> UserPayload {
        UserPayload {
            name: name.into(),
            email: email.into(),
        }
    }

    #[test]
    fn accepts_and_trims_valid_user() {
        let user = payload("  Ann ", "ann@x.com").validate().unwrap();
        assert_eq!(user, NewUser::new("Ann", "ann@x.com"));
    }

    #[test]
    fn rejects_blank_name_and_bad_email() {
        assert!(matches!(
            payload("   ", "ann@x.com").validate(),
            Err(DomainError::BadRequest(_))
        ));
        assert!(matches!(
            payload("Ann", "").validate(),
            Err(DomainError::BadRequest(_))
        ));
        assert!(matches!(
            payload("Ann", "not-an-email").validate(),
            Err(DomainError::BadRequest(_))
        ));
    }

    #[test]
    fn query_defaults_and_bounds() {
        let query: ListPostsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.pagination().unwrap(), Pagination::default());

        let too_big = ListPostsQuery {
            page: 1,
            size: MAX_PAGE_SIZE + 1,
        };
        assert!(too_big.pagination().is_err());

        let zero_page = ListPostsQuery { page: 0, size: 10 };
        assert!(zero_page.pagination().is_err());
    }
}
