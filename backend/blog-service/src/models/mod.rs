/// Data models for blog-service
pub mod page;
pub mod post;
pub mod profile;
pub mod user;

pub use page::{Page, PageRequest, PAGE_SIZE};
pub use post::{NewPost, Post, PostForm, PostWrite};
pub use profile::{Profile, ProfileView, DEFAULT_PROFILE_IMAGE};
pub use user::{AccountUpdate, LoginRequest, NewUser, RegisterRequest, User};
