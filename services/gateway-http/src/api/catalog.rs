//! Descriptors for every forwarded operation.

use http::Method;

use crate::proxy::{Access, AuthRequirement, IdentityParams, Operation, Upstream};

pub static SIGN_UP: Operation = Operation {
    name: "sign_up",
    upstream: Upstream::Users,
    method: Some(Method::POST),
    path: "/signup",
    auth: AuthRequirement::Public,
    access: Access::Anyone,
    identity_params: IdentityParams::None,
};

pub static LOGIN: Operation = Operation {
    name: "login",
    upstream: Upstream::Users,
    method: Some(Method::POST),
    path: "/login",
    auth: AuthRequirement::Public,
    access: Access::Anyone,
    identity_params: IdentityParams::None,
};

/// Local only; no upstream call is made.
pub static LOGOUT: Operation = Operation {
    name: "logout",
    upstream: Upstream::Users,
    method: None,
    path: "",
    auth: AuthRequirement::Required,
    access: Access::Anyone,
    identity_params: IdentityParams::None,
};

pub static DELETE_USER: Operation = Operation {
    name: "delete_user",
    upstream: Upstream::Users,
    method: Some(Method::DELETE),
    path: "/delete",
    auth: AuthRequirement::Required,
    access: Access::Anyone,
    identity_params: IdentityParams::None,
};

pub static GET_USER: Operation = Operation {
    name: "get_user",
    upstream: Upstream::Users,
    method: Some(Method::GET),
    path: "/resolve",
    auth: AuthRequirement::Required,
    access: Access::Anyone,
    identity_params: IdentityParams::None,
};

pub static LIST_CONTENT: Operation = Operation {
    name: "list_content",
    upstream: Upstream::Content,
    method: Some(Method::GET),
    path: "/list",
    auth: AuthRequirement::Public,
    access: Access::Anyone,
    identity_params: IdentityParams::None,
};

pub static GET_CONTENT_ITEM: Operation = Operation {
    name: "get_content_item",
    upstream: Upstream::Content,
    method: Some(Method::GET),
    path: "/get/{id}",
    auth: AuthRequirement::Optional,
    access: Access::Anyone,
    identity_params: IdentityParams::UserId,
};

pub static LIKE_CONTENT: Operation = Operation {
    name: "like_content",
    upstream: Upstream::Content,
    method: Some(Method::POST),
    path: "/{id}/like",
    auth: AuthRequirement::Required,
    access: Access::Anyone,
    identity_params: IdentityParams::UserId,
};

pub static ADD_CONTENT: Operation = Operation {
    name: "add_content",
    upstream: Upstream::Content,
    method: Some(Method::POST),
    path: "/add",
    auth: AuthRequirement::Required,
    access: Access::Anyone,
    identity_params: IdentityParams::UserId,
};

/// Author lookup made before a non-admin removal.
pub static LOOKUP_CONTENT_AUTHOR: Operation = Operation {
    name: "lookup_content_author",
    upstream: Upstream::Content,
    method: Some(Method::GET),
    path: "/get/{id}",
    auth: AuthRequirement::Required,
    access: Access::Anyone,
    identity_params: IdentityParams::UserId,
};

pub static REMOVE_CONTENT: Operation = Operation {
    name: "remove_content",
    upstream: Upstream::Content,
    method: Some(Method::POST),
    path: "/{id}/remove",
    auth: AuthRequirement::Required,
    access: Access::Anyone,
    identity_params: IdentityParams::UserIdAndAdmin,
};

pub static EDIT_CONTENT: Operation = Operation {
    name: "edit_content",
    upstream: Upstream::Content,
    method: Some(Method::POST),
    path: "/{id}/update",
    auth: AuthRequirement::Required,
    access: Access::Admin,
    identity_params: IdentityParams::UserIdAndAdmin,
};

pub static GET_COMMENT: Operation = Operation {
    name: "get_comment",
    upstream: Upstream::Content,
    method: Some(Method::GET),
    path: "/comments/get/{id}",
    auth: AuthRequirement::Public,
    access: Access::Anyone,
    identity_params: IdentityParams::None,
};

pub static NEW_COMMENT: Operation = Operation {
    name: "new_comment",
    upstream: Upstream::Content,
    method: Some(Method::POST),
    path: "/comments/new",
    auth: AuthRequirement::Required,
    access: Access::Anyone,
    identity_params: IdentityParams::UserId,
};

pub static EDIT_COMMENT: Operation = Operation {
    name: "edit_comment",
    upstream: Upstream::Content,
    method: Some(Method::POST),
    path: "/comments/update",
    auth: AuthRequirement::Required,
    access: Access::Admin,
    identity_params: IdentityParams::UserIdAndAdmin,
};

pub static DELETE_COMMENT: Operation = Operation {
    name: "delete_comment",
    upstream: Upstream::Content,
    method: Some(Method::POST),
    path: "/comments/remove",
    auth: AuthRequirement::Required,
    access: Access::Admin,
    identity_params: IdentityParams::UserIdAndAdmin,
};
