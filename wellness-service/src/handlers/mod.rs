pub mod health;
pub mod wellness;

pub use health::{health_check, metrics, readiness_check};
pub use wellness::{
    analyze_food, chat, daily_tips, exercise_recommendations, goal_tracking, health_assessment,
    mood,
};
