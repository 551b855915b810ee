pub mod cei;
