use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quiz Arena Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::game_stream,
        crate::routes::sse::scoring_stream,
        crate::routes::public::leaderboard,
        crate::routes::public::active_timers,
        crate::routes::organizer::list_games,
        crate::routes::organizer::create_game,
        crate::routes::organizer::get_game,
        crate::routes::organizer::delete_game,
        crate::routes::organizer::set_active,
        crate::routes::organizer::rename_game,
        crate::routes::organizer::list_teams,
        crate::routes::organizer::delete_team,
        crate::routes::organizer::rename_team,
        crate::routes::organizer::list_rounds,
        crate::routes::organizer::create_round,
        crate::routes::organizer::reorder_rounds,
        crate::routes::organizer::answer_grid,
        crate::routes::organizer::replace_questions,
        crate::routes::organizer::delete_round,
        crate::routes::organizer::rename_round,
        crate::routes::organizer::open_round,
        crate::routes::organizer::close_round,
        crate::routes::organizer::toggle_round,
        crate::routes::organizer::start_timer,
        crate::routes::organizer::stop_timer,
        crate::routes::organizer::submission_status,
        crate::routes::organizer::grant_resubmit,
        crate::routes::organizer::adjust_answer,
        crate::routes::player::join,
        crate::routes::player::list_rounds,
        crate::routes::player::submit_answers,
        crate::routes::player::round_scores,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::SetActiveRequest,
            crate::dto::game::RenameRequest,
            crate::dto::game::GameSummary,
            crate::dto::game::JoinRequest,
            crate::dto::game::JoinResponse,
            crate::dto::game::TeamSummary,
            crate::dto::round::QuestionKindDto,
            crate::dto::round::QuestionDto,
            crate::dto::round::CreateRoundRequest,
            crate::dto::round::ReplaceQuestionsRequest,
            crate::dto::round::ReorderRoundsRequest,
            crate::dto::round::StartTimerRequest,
            crate::dto::round::RoundSummary,
            crate::dto::round::ActiveTimer,
            crate::dto::round::PlayerQuestion,
            crate::dto::round::PlayerRoundView,
            crate::dto::submission::SubmitAnswersRequest,
            crate::dto::submission::SubmissionResponse,
            crate::dto::submission::SubmissionStatusEntry,
            crate::dto::scoring::AdjustAnswerRequest,
            crate::dto::scoring::AnswerView,
            crate::dto::scoring::RoundSubtotal,
            crate::dto::scoring::LeaderboardEntry,
            crate::dto::scoring::QuestionScore,
            crate::dto::scoring::TeamRoundScore,
            crate::dto::sse::Handshake,
            crate::dto::sse::RoundStatusChangedEvent,
            crate::dto::sse::RoundClosedEvent,
            crate::dto::sse::TimerStartedEvent,
            crate::dto::sse::TimerStoppedEvent,
            crate::dto::sse::SubmissionCountChangedEvent,
            crate::dto::sse::SubmissionClearedEvent,
            crate::dto::sse::GameFinalisingEvent,
            crate::dto::sse::ScoreChangedEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "organizer", description = "Game and team management, organizer token required"),
        (name = "rounds", description = "Round lifecycle and countdowns, organizer token required"),
        (name = "scoring", description = "Answer grid and manual adjustments, organizer token required"),
        (name = "player", description = "Joining, submitting and reading own scores"),
        (name = "public", description = "Read-only game views"),
    )
)]
pub struct ApiDoc;
