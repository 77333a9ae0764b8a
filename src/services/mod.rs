/// Organiser operations: registration, lifecycle, QR payloads, disqualification.
pub mod admin_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Public service for read-only tournament information.
pub mod public_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events streaming.
pub mod sse_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// Student dashboard operations: login, scan, anti-cheat reports.
pub mod team_service;
/// Session metadata and leaderboard helpers shared across services.
pub mod tournament_service;
