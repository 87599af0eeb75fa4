use tonic::{Request, Response, Status};

use crate::auth::{Accounts, TokenIssuer};
use crate::catalog::Catalog;
use crate::middleware::AuthenticatedUser;
use crate::models::User;
use crate::proto::auth::auth_service_server::AuthService;
use crate::proto::auth::{
    AuthResponse, LoginRequest, RegisterRequest, User as UserProto, ValidateTokenRequest,
    ValidateTokenResponse,
};
use crate::proto::common::Empty;

pub struct AuthServiceImpl {
    accounts: Accounts,
    catalog: Catalog,
    tokens: TokenIssuer,
}

impl AuthServiceImpl {
    pub fn new(catalog: Catalog, tokens: TokenIssuer) -> Self {
        Self {
            accounts: Accounts::new(catalog.clone()),
            catalog,
            tokens,
        }
    }

    fn get_authenticated_user<T>(request: &Request<T>) -> Result<AuthenticatedUser, Status> {
        request
            .extensions()
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| Status::unauthenticated("Authentication required"))
    }

    fn user_to_proto(user: &User) -> UserProto {
        UserProto {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }

    fn auth_response(&self, user: &User) -> Result<AuthResponse, Status> {
        let (token, exp) = self.tokens.issue(user)?;
        Ok(AuthResponse {
            token,
            expires_at: exp.to_rfc3339(),
            user: Some(Self::user_to_proto(user)),
        })
    }
}

#[tonic::async_trait]
impl AuthService for AuthServiceImpl {
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<AuthResponse>, Status> {
        let req = request.into_inner();

        let user = self
            .accounts
            .register(&req.email, &req.password, &req.name)
            .await?;
        tracing::info!("Registered user: id={}, email={}", user.id, user.email);

        Ok(Response::new(self.auth_response(&user)?))
    }

    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<AuthResponse>, Status> {
        let req = request.into_inner();

        if req.email.is_empty() || req.password.is_empty() {
            return Err(Status::invalid_argument("email and password are required"));
        }

        let user = self.accounts.authenticate(&req.email, &req.password).await?;
        tracing::info!("Login: user_id={}", user.id);

        Ok(Response::new(self.auth_response(&user)?))
    }

    async fn validate_token(
        &self,
        request: Request<ValidateTokenRequest>,
    ) -> Result<Response<ValidateTokenResponse>, Status> {
        let req = request.into_inner();

        match self.tokens.verify(&req.token) {
            Ok(claims) => Ok(Response::new(ValidateTokenResponse {
                valid: true,
                user: Some(Self::user_to_proto(&claims.user())),
            })),
            Err(_) => Ok(Response::new(ValidateTokenResponse {
                valid: false,
                user: None,
            })),
        }
    }

    async fn get_current_user(
        &self,
        request: Request<Empty>,
    ) -> Result<Response<UserProto>, Status> {
        let auth_user = Self::get_authenticated_user(&request)?;

        // Token may outlive the account in a wiped local store
        let user = self
            .catalog
            .find_user_by_id(&auth_user.user_id)
            .await?
            .ok_or_else(|| Status::not_found("User not found"))?;

        Ok(Response::new(Self::user_to_proto(&user)))
    }
}
