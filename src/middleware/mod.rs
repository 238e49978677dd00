/*
 * Responsibility
 * - middleware の公開インターフェース
 * - 認可は middleware ではなく handler の Authorized<P> extractor で行う
 */
pub mod cors;
pub mod http;
