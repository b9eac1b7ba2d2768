//! Prompt templates for the wellness endpoints.
//!
//! Each [`Endpoint`] knows its required input, the form field its files
//! arrive under, the response field its reply is returned in, and how to
//! turn a [`WellnessRequest`] into the prompt text sent to the model.

use crate::dtos::WellnessRequest;
use crate::models::PromptRequest;
use service_core::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    AnalyzeFood,
    Chat,
    DailyTips,
    Mood,
    ExerciseRecommendations,
    HealthAssessment,
    GoalTracking,
}

impl Endpoint {
    /// Route the endpoint is served on.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::AnalyzeFood => "/analyze-food",
            Endpoint::Chat => "/chat",
            Endpoint::DailyTips => "/daily-tips",
            Endpoint::Mood => "/mood",
            Endpoint::ExerciseRecommendations => "/exercise-recommendations",
            Endpoint::HealthAssessment => "/health-assessment",
            Endpoint::GoalTracking => "/goal-tracking",
        }
    }

    /// Label used in logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::AnalyzeFood => "analyze_food",
            Endpoint::Chat => "chat",
            Endpoint::DailyTips => "daily_tips",
            Endpoint::Mood => "mood",
            Endpoint::ExerciseRecommendations => "exercise_recommendations",
            Endpoint::HealthAssessment => "health_assessment",
            Endpoint::GoalTracking => "goal_tracking",
        }
    }

    /// Key holding the model's text in the success envelope.
    pub fn response_field(&self) -> &'static str {
        match self {
            Endpoint::AnalyzeFood => "analysis",
            Endpoint::Chat => "response",
            Endpoint::DailyTips => "tips",
            Endpoint::Mood => "analysis",
            Endpoint::ExerciseRecommendations => "recommendations",
            Endpoint::HealthAssessment => "assessment",
            Endpoint::GoalTracking => "feedback",
        }
    }

    /// Multipart field whose files accompany the prompt.
    pub fn file_field(&self) -> &'static str {
        match self {
            Endpoint::AnalyzeFood => "image",
            Endpoint::Chat | Endpoint::DailyTips => "context_files",
            Endpoint::Mood => "mood_history",
            Endpoint::ExerciseRecommendations => "fitness_history",
            Endpoint::HealthAssessment => "health_documents",
            Endpoint::GoalTracking => "progress_data",
        }
    }

    /// Reject requests missing their mandatory input.
    pub fn validate(&self, request: &WellnessRequest) -> Result<(), AppError> {
        let missing = match self {
            Endpoint::AnalyzeFood if !request.has_files("image") => Some("No image provided"),
            Endpoint::Chat if !request.has("message") => Some("No message provided"),
            Endpoint::Mood if !request.has("mood") => Some("No mood provided"),
            // Documents alone are not assessment data.
            Endpoint::HealthAssessment if request.field_count() == 0 => {
                Some("No assessment data provided")
            }
            Endpoint::GoalTracking if !(request.has("goal") && request.has("progress")) => {
                Some("Missing goal or progress data")
            }
            _ => None,
        };

        match missing {
            Some(message) => Err(AppError::BadRequest(anyhow::anyhow!(message))),
            None => Ok(()),
        }
    }

    /// Render the prompt text. Absent optional values read as "not specified".
    pub fn build_prompt(&self, request: &WellnessRequest) -> String {
        match self {
            Endpoint::AnalyzeFood => "\
Analyze this food image and provide:
1. Estimated nutritional content (calories, protein, fats, carbs)
2. Health score out of 100
3. Nutritional recommendations
4. Potential allergens or dietary considerations
5. Meal timing suggestions
Format as a detailed but concise analysis."
                .to_string(),

            Endpoint::Chat => format!(
                "Consider the user's message and any provided context files to give a comprehensive wellness response.\n\
                 \n\
                 User message: {}\n\
                 \n\
                 Provide:\n\
                 1. Empathetic acknowledgment\n\
                 2. Relevant wellness advice\n\
                 3. Actionable next steps\n\
                 4. Any relevant health considerations",
                request.text("message")
            ),

            Endpoint::DailyTips => format!(
                "Generate personalized productivity tips considering:\n\
                 - Time of day: {}\n\
                 - Energy level: {}\n\
                 - Work environment: {}\n\
                 \n\
                 Provide:\n\
                 1. 3-5 actionable tips\n\
                 2. Estimated time investment for each\n\
                 3. Expected wellness benefits",
                request.text("time_of_day"),
                request.text("energy_level"),
                request.text("environment")
            ),

            Endpoint::Mood => format!(
                "Analyze the current mood '{}' and any provided mood history.\n\
                 \n\
                 Consider:\n\
                 - Time: {}\n\
                 - Triggers: {}\n\
                 - Duration: {}\n\
                 \n\
                 Include:\n\
                 1. Validation of their feelings\n\
                 2. A practical suggestion for mood improvement\n\
                 3. A positive affirmation\n\
                 4. Coping strategies",
                request.text("mood"),
                request.text("time"),
                request.text("triggers"),
                request.text("duration")
            ),

            Endpoint::ExerciseRecommendations => format!(
                "Generate personalized exercise recommendations considering:\n\
                 - Fitness level: {}\n\
                 - Preferences: {}\n\
                 - Limitations: {}\n\
                 - Available equipment: {}\n\
                 \n\
                 Include:\n\
                 1. Exercise name\n\
                 2. Duration\n\
                 3. Expected benefits\n\
                 4. Safety considerations\n\
                 5. Progressive overload suggestions",
                request.text_or("fitness_level", "beginner"),
                request.text("preferences"),
                request.text("limitations"),
                request.text("equipment")
            ),

            Endpoint::HealthAssessment => format!(
                "Provide a health assessment based on the following information:\n\
                 - Age: {}\n\
                 - Weight: {}\n\
                 - Height: {}\n\
                 - Activity Level: {}\n\
                 - Sleep Hours: {}\n\
                 - Stress Level: {}\n\
                 \n\
                 Include:\n\
                 1. General health overview\n\
                 2. Areas of concern\n\
                 3. Improvement recommendations\n\
                 4. Follow-up suggestions",
                request.text("age"),
                request.text("weight"),
                request.text("height"),
                request.text("activity_level"),
                request.text("sleep_hours"),
                request.text("stress_level")
            ),

            Endpoint::GoalTracking => format!(
                "Analyze goal progress and provide feedback:\n\
                 Goal: {}\n\
                 Current Progress: {}\n\
                 Timeline: {}\n\
                 Challenges: {}\n\
                 \n\
                 Include:\n\
                 1. Progress analysis\n\
                 2. Milestone achievements\n\
                 3. Adjustment recommendations\n\
                 4. Next steps\n\
                 5. Motivation strategies",
                request.text("goal"),
                request.text("progress"),
                request.text("timeline"),
                request.text("challenges")
            ),
        }
    }

    /// Validate `request` and turn it into the prompt plus this endpoint's files.
    pub fn prepare(&self, mut request: WellnessRequest) -> Result<PromptRequest, AppError> {
        self.validate(&request)?;
        let prompt = self.build_prompt(&request);
        let attachments = request.take_files(self.file_field());
        Ok(PromptRequest::new(prompt, attachments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::NOT_SPECIFIED;
    use crate::models::Attachment;
    use serde_json::{json, Map};

    fn json_request(value: serde_json::Value) -> WellnessRequest {
        WellnessRequest::from_json(value)
    }

    fn error_message(result: Result<PromptRequest, AppError>) -> String {
        match result {
            Err(AppError::BadRequest(e)) => e.to_string(),
            Err(other) => panic!("expected bad request, got {:?}", other),
            Ok(_) => panic!("expected bad request, got a prompt"),
        }
    }

    #[test]
    fn required_inputs_are_enforced() {
        let cases = [
            (Endpoint::AnalyzeFood, json!({}), "No image provided"),
            (Endpoint::Chat, json!({"mood": "ok"}), "No message provided"),
            (Endpoint::Mood, json!({"time": "now"}), "No mood provided"),
            (Endpoint::HealthAssessment, json!({}), "No assessment data provided"),
            (Endpoint::GoalTracking, json!({"goal": "X"}), "Missing goal or progress data"),
            (Endpoint::GoalTracking, json!({"progress": "1km"}), "Missing goal or progress data"),
        ];

        for (endpoint, body, expected) in cases {
            let message = error_message(endpoint.prepare(json_request(body)));
            assert_eq!(message, expected, "{:?}", endpoint);
        }
    }

    #[test]
    fn null_required_field_counts_as_missing() {
        let message = error_message(Endpoint::Mood.prepare(json_request(json!({"mood": null}))));
        assert_eq!(message, "No mood provided");
    }

    #[test]
    fn optional_endpoints_accept_empty_input() {
        for endpoint in [Endpoint::DailyTips, Endpoint::ExerciseRecommendations] {
            let prepared = endpoint
                .prepare(WellnessRequest::default())
                .expect("empty request should be accepted");
            assert!(prepared.attachments.is_empty());
        }
    }

    #[test]
    fn absent_optionals_read_not_specified() {
        let prompt = Endpoint::DailyTips.build_prompt(&WellnessRequest::default());

        assert!(prompt.contains(&format!("- Time of day: {}", NOT_SPECIFIED)));
        assert!(prompt.contains(&format!("- Energy level: {}", NOT_SPECIFIED)));
        assert!(prompt.contains(&format!("- Work environment: {}", NOT_SPECIFIED)));
    }

    #[test]
    fn fitness_level_defaults_to_beginner() {
        let prompt = Endpoint::ExerciseRecommendations.build_prompt(&WellnessRequest::default());

        assert!(prompt.contains("- Fitness level: beginner"));
        assert!(prompt.contains(&format!("- Limitations: {}", NOT_SPECIFIED)));
    }

    #[test]
    fn mood_prompt_interpolates_values() {
        let request = json_request(json!({
            "mood": "anxious",
            "triggers": ["deadline", "poor sleep"],
            "duration": "2 days"
        }));

        let prompt = Endpoint::Mood.build_prompt(&request);

        assert!(prompt.starts_with("Analyze the current mood 'anxious' and any provided mood history."));
        assert!(prompt.contains("- Triggers: deadline, poor sleep"));
        assert!(prompt.contains("- Duration: 2 days"));
        assert!(prompt.contains(&format!("- Time: {}", NOT_SPECIFIED)));
        assert!(prompt.ends_with("4. Coping strategies"));
    }

    #[test]
    fn template_lines_are_not_indented() {
        let request = json_request(json!({"goal": "Run 5k", "progress": "3k"}));
        let prompt = Endpoint::GoalTracking.build_prompt(&request);

        assert!(prompt.lines().all(|line| !line.starts_with(' ')));
        assert!(prompt.contains("Goal: Run 5k\nCurrent Progress: 3k\n"));
    }

    #[test]
    fn prepare_takes_only_the_endpoint_files() {
        let request = WellnessRequest::new(
            Map::new(),
            vec![
                ("image".into(), Attachment::from_bytes(b"jpeg".to_vec())),
                ("context_files".into(), Attachment::from_bytes(b"ignored".to_vec())),
            ],
        );

        let prepared = Endpoint::AnalyzeFood.prepare(request).expect("image present");

        assert_eq!(prepared.attachments.len(), 1);
        assert_eq!(prepared.attachments[0].data, b"jpeg");
        assert!(prepared.prompt.starts_with("Analyze this food image"));
    }

    #[test]
    fn health_assessment_needs_fields_besides_documents() {
        let documents_only = WellnessRequest::new(
            Map::new(),
            vec![("health_documents".into(), Attachment::from_bytes(b"lab".to_vec()))],
        );
        let err = Endpoint::HealthAssessment
            .prepare(documents_only)
            .expect_err("documents alone are not assessment data");
        assert_eq!(err.to_string(), "Bad request: No assessment data provided");

        let mut fields = Map::new();
        fields.insert("age".into(), serde_json::Value::String("52".into()));
        let with_fields = WellnessRequest::new(
            fields,
            vec![("health_documents".into(), Attachment::from_bytes(b"lab".to_vec()))],
        );
        let prepared = Endpoint::HealthAssessment
            .prepare(with_fields)
            .expect("fields plus documents are accepted");

        assert_eq!(prepared.attachments.len(), 1);
        assert!(prepared.prompt.contains(&format!("- Weight: {}", NOT_SPECIFIED)));
    }

    #[test]
    fn paths_are_distinct() {
        let endpoints = [
            Endpoint::AnalyzeFood,
            Endpoint::Chat,
            Endpoint::DailyTips,
            Endpoint::Mood,
            Endpoint::ExerciseRecommendations,
            Endpoint::HealthAssessment,
            Endpoint::GoalTracking,
        ];
        let paths: std::collections::HashSet<_> = endpoints.iter().map(|e| e.path()).collect();
        assert_eq!(paths.len(), endpoints.len());
        assert_eq!(Endpoint::HealthAssessment.path(), "/health-assessment");
    }
}
