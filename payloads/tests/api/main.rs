mod auth;
mod dashboard;
mod documents;
mod notifications;
mod permits;
mod resources;
