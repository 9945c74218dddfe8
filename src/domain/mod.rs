mod types;

pub use types::{
    AvatarCacheRow, Feedback, Interview, InterviewStatus, Question, QuestionCategory,
    QuestionDifficulty, Response, TtsCacheRow, VoiceProfile,
};
