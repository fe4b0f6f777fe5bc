mod common;
mod notification;
mod routing;
