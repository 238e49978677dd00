/*
 * Responsibility
 * - テーブルごとの SQLx 操作 (movies / actors)
 */
pub mod actor_repo;
pub mod error;
pub mod movie_repo;
