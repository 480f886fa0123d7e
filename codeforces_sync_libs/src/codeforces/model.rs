use serde::{Deserialize, Serialize};

/// Envelope shared by every Codeforces API method.
#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse<T> {
    pub status: String,
    pub comment: Option<String>,
    pub result: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub handle: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub rank: Option<String>,
    pub rating: Option<i32>,
    pub max_rating: Option<i32>,
    pub avatar: Option<String>,
    pub title_photo: Option<String>,
    pub friend_of_count: Option<i32>,
}

/// One entry of `user.rating`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RatingChange {
    pub contest_id: Option<i64>,
    pub contest_name: Option<String>,
    pub handle: Option<String>,
    pub rank: Option<i32>,
    pub old_rating: Option<i32>,
    pub new_rating: Option<i32>,
    #[serde(default)]
    pub rating_update_time_seconds: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub contest_id: Option<i64>,
    pub index: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub problem_type: Option<String>,
    pub rating: Option<i32>,
}

/// One entry of `user.status`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Option<i64>,
    pub contest_id: Option<i64>,
    #[serde(default)]
    pub creation_time_seconds: i64,
    pub problem: Option<Problem>,
    pub programming_language: Option<String>,
    pub verdict: Option<String>,
}
