//! Templating code.
//!
//! This defines the [`Page`] item, which every HTML page of this crate is
//! wrapped in.

use hypertext::prelude::*;

use crate::{auth::User, permission::Role};

/// The parts of the logged-in user which the navigation bar needs.
struct NavUser {
    username: String,
    role: Role,
}

pub struct Page<R: Renderable> {
    body: Option<R>,
    user: Option<NavUser>,
}

impl<R: Renderable> Page<R> {
    pub fn new() -> Self {
        Page {
            body: None,
            user: None,
        }
    }

    pub fn body(mut self, body: R) -> Self {
        self.body = Some(body);
        self
    }

    pub fn user<const TX: bool>(mut self, user: &User<TX>) -> Self {
        self.user = Some(NavUser {
            username: user.username.clone(),
            role: user.role(),
        });
        self
    }
}

impl<R: Renderable> Renderable for Page<R> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            html {
                head {
                    title { "SAN questionnaire" }
                    meta charset="utf-8";
                    meta
                        name="viewport"
                        content="width=device-width, initial-scale=1";
                    link
                        href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css"
                        rel="stylesheet";
                }
                body class="d-flex flex-column vh-100" {
                    nav class="navbar navbar-expand"
                        style="background-color: #2b4c59;"
                        data-bs-theme="dark" {
                        div class="container-fluid" {
                            a class="navbar-brand text-white" href="/" {
                                "SAN"
                            }
                            @if let Some(user) = &self.user {
                                ul class="navbar-nav me-auto" {
                                    @match user.role {
                                        Role::Staff => {
                                            li class="nav-item" {
                                                a class="nav-link text-white" href="/admin-dashboard" { "Dashboard" }
                                            }
                                            li class="nav-item" {
                                                a class="nav-link text-white" href="/report" { "Report" }
                                            }
                                            li class="nav-item" {
                                                a class="nav-link text-white" href="/participants" { "Participants" }
                                            }
                                            li class="nav-item" {
                                                a class="nav-link text-white" href="/responses" { "Responses" }
                                            }
                                        }
                                        Role::Member => {
                                            li class="nav-item" {
                                                a class="nav-link text-white" href="/profile" { "Profile" }
                                            }
                                            li class="nav-item" {
                                                a class="nav-link text-white" href="/survey" { "Take the survey" }
                                            }
                                        }
                                    }
                                }
                            }
                            ul class="navbar-nav" style="display: flex; gap: 1rem;" {
                                @if let Some(user) = &self.user {
                                    li class="nav-item" {
                                        span class="navbar-text text-white" {
                                            (user.username)
                                        }
                                    }
                                    li class="nav-item" {
                                        form method="post" action="/logout" class="d-inline" {
                                            button type="submit" class="btn btn-link nav-link text-white" {
                                                "Log out"
                                            }
                                        }
                                    }
                                } @else {
                                    li class="nav-item" {
                                        a class="nav-link text-white" href="/login" {
                                            "Login"
                                        }
                                    }
                                    li class="nav-item" {
                                        a class="nav-link text-white" href="/register" {
                                            "Register"
                                        }
                                    }
                                }
                            }
                        }
                    }
                    div class="container flex-grow-1 py-4" {
                        @if let Some(body) = &self.body {
                            (body)
                        }
                    }
                }
            }
        }.render_to(buffer)
    }
}
