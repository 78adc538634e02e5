//! Route paths.

pub const GET_HEALTH: &str = "/api/v1/health";

pub const GET_AUTH: &str = "/api/v1/auth";
pub const POST_AUTH_LOGIN: &str = "/api/v1/auth";
pub const POST_AUTH_REGISTER: &str = "/api/v1/auth/register";
pub const POST_AUTH_REFRESH: &str = "/api/v1/auth/refresh-token";
pub const POST_AUTH_LOGOUT: &str = "/api/v1/auth/logout";
pub const POST_AUTH_VERIFY_EMAIL: &str = "/api/v1/auth/verify-email";

pub const GET_USERS: &str = "/api/v1/users";
pub const GET_USERS_ID: &str = "/api/v1/users/{id}";
pub const PUT_USERS_ID: &str = "/api/v1/users/{id}";
