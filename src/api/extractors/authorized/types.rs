/**
 * Responsibility
 *
 * 主な責務
 *  - エンドポイントごとの権限タグ型を宣言する
 *  - リソースが増えたらここに追記する
 *
 * 置かないもの
 *  - 認可ロジック / extractor 実装
 */
use super::core::{Authorized, Permission};

macro_rules! permission {
    ($tag:ident, $alias:ident, $name:literal) => {
        pub enum $tag {}

        impl Permission for $tag {
            const NAME: &'static str = $name;
        }

        pub type $alias = Authorized<$tag>;
    };
}

// movies
permission!(GetMovies, CanGetMovies, "get:movies");
permission!(PostMovies, CanPostMovies, "post:movies");
permission!(PatchMovies, CanPatchMovies, "patch:movies");
permission!(DeleteMovies, CanDeleteMovies, "delete:movies");

// actors
permission!(GetActors, CanGetActors, "get:actors");
permission!(PostActors, CanPostActors, "post:actors");
permission!(PatchActors, CanPatchActors, "patch:actors");
permission!(DeleteActors, CanDeleteActors, "delete:actors");
