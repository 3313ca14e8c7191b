//! User

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User { pub id: i64, pub email: String, pub name: String }
