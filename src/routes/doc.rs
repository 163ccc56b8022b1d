use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{
            CodeIssued, ForgotPasswordRequest, RefreshRequest, ResetPasswordRequest,
            SignInRequest, SignUpRequest, TokenPair, VerifyRequest,
        },
        roles::{CreateRoleRequest, UpdateRoleRequest},
        users::UpdateUserRequest,
        website::UpsertWebsiteRequest,
    },
    models::{UserProfile, WebsiteInfo},
    response::{ApiResponse, Meta},
    routes::{auth, health, website},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::sign_up,
        auth::verify,
        auth::sign_in,
        auth::refresh,
        auth::sign_out,
        auth::forgot_password,
        auth::reset_password,
        auth::me,
        website::get_website,
        website::upsert_website
    ),
    components(
        schemas(
            SignUpRequest,
            VerifyRequest,
            SignInRequest,
            RefreshRequest,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            CodeIssued,
            TokenPair,
            UserProfile,
            WebsiteInfo,
            UpsertWebsiteRequest,
            CreateRoleRequest,
            UpdateRoleRequest,
            UpdateUserRequest,
            Meta,
            ApiResponse<TokenPair>,
            ApiResponse<CodeIssued>,
            ApiResponse<UserProfile>,
            ApiResponse<WebsiteInfo>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Sign-up, verification, sessions and password reset"),
        (name = "Website", description = "Store-wide website information"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
