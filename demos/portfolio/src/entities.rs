//! The portfolio data model.

use refract::model::DefaultValue;
use refract::{FieldKind, SchemaBuilder};
use serde_json::json;

pub const ROLE: [&str; 2] = ["USER", "ADMIN"];
pub const BLOG_STATUS: [&str; 2] = ["DRAFT", "PUBLISHED"];
pub const PROJECT_STATUS: [&str; 3] = ["PLANNED", "IN_PROGRESS", "COMPLETED"];
pub const EMPLOYMENT_TYPE: [&str; 5] = [
    "FULL_TIME",
    "PART_TIME",
    "CONTRACT",
    "FREELANCE",
    "INTERNSHIP",
];

pub fn enums(builder: SchemaBuilder) -> SchemaBuilder {
    builder
        .enumeration("Role", ROLE)
        .enumeration("BlogStatus", BLOG_STATUS)
        .enumeration("ProjectStatus", PROJECT_STATUS)
        .enumeration("EmploymentType", EMPLOYMENT_TYPE)
}

/// Authentication: users with their linked provider accounts and sessions
pub fn accounts(builder: SchemaBuilder) -> SchemaBuilder {
    builder
        .entity("User", |e| {
            e.field("id", FieldKind::String)
                .id()
                .default(DefaultValue::Cuid);
            e.field("name", FieldKind::String).nullable().optional();
            e.field("email", FieldKind::String).unique();
            e.field("emailVerified", FieldKind::DateTime)
                .nullable()
                .optional();
            e.field("image", FieldKind::String).nullable().optional();
            e.field("role", FieldKind::enumeration("Role"))
                .default(DefaultValue::Value(json!("USER")));
            e.field("createdAt", FieldKind::DateTime)
                .default(DefaultValue::Now);
            e.field("updatedAt", FieldKind::DateTime).updated_at();
            e.relation("accounts", "Account").many();
            e.relation("sessions", "Session").many();
            e.relation("blogs", "Blog").many();
            e.relation("projects", "Project").many();
            e.relation("skillCategories", "SkillCategory").many();
            e.relation("experiences", "WorkExperience").many();
        })
        .entity("Account", |e| {
            e.field("id", FieldKind::String)
                .id()
                .default(DefaultValue::Cuid);
            e.field("userId", FieldKind::String);
            e.field("type", FieldKind::String);
            e.field("provider", FieldKind::String);
            e.field("providerAccountId", FieldKind::String);
            e.field("refreshToken", FieldKind::String)
                .nullable()
                .optional();
            e.field("accessToken", FieldKind::String)
                .nullable()
                .optional();
            e.field("expiresAt", FieldKind::Int).nullable().optional();
            e.field("scope", FieldKind::String).nullable().optional();
            e.relation("user", "User")
                .fields(["userId"])
                .references(["id"]);
            e.unique(["provider", "providerAccountId"]);
        })
        .entity("Session", |e| {
            e.field("id", FieldKind::String)
                .id()
                .default(DefaultValue::Cuid);
            e.field("sessionToken", FieldKind::String).unique();
            e.field("userId", FieldKind::String);
            e.field("expires", FieldKind::DateTime);
            e.relation("user", "User")
                .fields(["userId"])
                .references(["id"]);
        })
}

/// Published content: blog posts and projects
pub fn content(builder: SchemaBuilder) -> SchemaBuilder {
    builder
        .entity("Blog", |e| {
            e.field("id", FieldKind::String)
                .id()
                .default(DefaultValue::Cuid);
            e.field("title", FieldKind::String);
            e.field("slug", FieldKind::String).unique();
            e.field("content", FieldKind::String);
            e.field("excerpt", FieldKind::String).nullable().optional();
            e.field("coverImage", FieldKind::String)
                .nullable()
                .optional();
            e.field("tags", FieldKind::String).list().optional();
            e.field("status", FieldKind::enumeration("BlogStatus"))
                .default(DefaultValue::Value(json!("DRAFT")));
            e.field("views", FieldKind::Int)
                .default(DefaultValue::Value(json!(0)));
            e.field("publishedAt", FieldKind::DateTime)
                .nullable()
                .optional();
            e.field("deletedAt", FieldKind::DateTime).nullable();
            e.field("createdAt", FieldKind::DateTime)
                .default(DefaultValue::Now);
            e.field("updatedAt", FieldKind::DateTime).updated_at();
            e.field("authorId", FieldKind::String);
            e.relation("author", "User")
                .fields(["authorId"])
                .references(["id"]);
            e.unique(["authorId", "title"]);
        })
        .entity("Project", |e| {
            e.field("id", FieldKind::String)
                .id()
                .default(DefaultValue::Cuid);
            e.field("title", FieldKind::String);
            e.field("description", FieldKind::String);
            e.field("status", FieldKind::enumeration("ProjectStatus"))
                .default(DefaultValue::Value(json!("PLANNED")));
            e.field("technologies", FieldKind::String)
                .list()
                .optional();
            e.field("repoUrl", FieldKind::String).nullable().optional();
            e.field("liveUrl", FieldKind::String).nullable().optional();
            e.field("featured", FieldKind::Boolean)
                .default(DefaultValue::Value(json!(false)));
            e.field("order", FieldKind::Int)
                .default(DefaultValue::Value(json!(0)));
            e.field("createdAt", FieldKind::DateTime)
                .default(DefaultValue::Now);
            e.field("ownerId", FieldKind::String);
            e.relation("owner", "User")
                .fields(["ownerId"])
                .references(["id"]);
        })
}

/// Résumé: skills grouped in categories, and work history
pub fn resume(builder: SchemaBuilder) -> SchemaBuilder {
    builder
        .entity("SkillCategory", |e| {
            e.field("id", FieldKind::String)
                .id()
                .default(DefaultValue::Cuid);
            e.field("name", FieldKind::String).unique();
            e.field("order", FieldKind::Int)
                .default(DefaultValue::Value(json!(0)));
            e.field("ownerId", FieldKind::String);
            e.relation("owner", "User")
                .fields(["ownerId"])
                .references(["id"]);
            e.relation("skills", "Skill").many();
        })
        .entity("Skill", |e| {
            e.field("id", FieldKind::String)
                .id()
                .default(DefaultValue::Cuid);
            e.field("name", FieldKind::String);
            e.field("level", FieldKind::Int)
                .default(DefaultValue::Value(json!(1)));
            e.field("years", FieldKind::Float).nullable().optional();
            e.field("categoryId", FieldKind::String);
            e.relation("category", "SkillCategory")
                .fields(["categoryId"])
                .references(["id"]);
            e.unique(["categoryId", "name"]);
        })
        .entity("WorkExperience", |e| {
            e.field("id", FieldKind::String)
                .id()
                .default(DefaultValue::Cuid);
            e.field("company", FieldKind::String);
            e.field("position", FieldKind::String);
            e.field("employmentType", FieldKind::enumeration("EmploymentType"))
                .default(DefaultValue::Value(json!("FULL_TIME")));
            e.field("location", FieldKind::String).nullable().optional();
            e.field("startDate", FieldKind::DateTime);
            e.field("endDate", FieldKind::DateTime).nullable().optional();
            e.field("current", FieldKind::Boolean)
                .default(DefaultValue::Value(json!(false)));
            e.field("description", FieldKind::String)
                .nullable()
                .optional();
            e.field("highlights", FieldKind::String).list().optional();
            e.field("userId", FieldKind::String);
            e.relation("user", "User")
                .fields(["userId"])
                .references(["id"]);
        })
}
