use clap::{Parser, Subcommand};
use mini_coursera::error::{AppError, AppResult};
use mini_coursera::model::entity::{
    Course, CourseCreate, Lesson, LessonCreate, Mooc, MoocCreate, Question, QuestionCreate,
    QuestionOptionCreate, UserEntity, UserEntityCreateUpdate, course,
};
use mini_coursera::model::{CrudRepository, DatabaseError, DbConnection, ModelManager};
use mini_coursera::web::{AuthenticatedUser, UserRole};

#[derive(Parser, Debug)]
#[command(about = "CLI tool for seeding the course DB", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// Manage courses
    Course {
        #[command(subcommand)]
        action: CourseCommands,
    },

    /// Manage course modules
    Mooc {
        #[command(subcommand)]
        action: MoocCommands,
    },

    /// Manage lessons
    Lesson {
        #[command(subcommand)]
        action: LessonCommands,
    },

    /// Manage exam questions
    Question {
        #[command(subcommand)]
        action: QuestionCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    Add {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        full_name: String,
        /// learner, instructor or admin
        #[arg(long, default_value = "learner")]
        role: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CourseCommands {
    Add {
        /// Username of the instructor owning the course
        #[arg(long)]
        owner: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "Beginner")]
        level: String,
        #[arg(long, default_value_t = 0)]
        price_cents: i64,
        /// Skip moderation and list the course right away
        #[arg(long, default_value_t = false)]
        publish: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum MoocCommands {
    Add {
        /// Course title to attach the module to
        #[arg(long)]
        course_title: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        order_index: Option<i32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum LessonCommands {
    Add {
        /// Module title to attach the lesson to
        #[arg(long)]
        mooc_title: String,
        #[arg(long)]
        title: String,
        /// Path to a Markdown file with lesson content
        #[arg(long)]
        file: String,
        #[arg(long)]
        order_index: Option<i32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum QuestionCommands {
    Add {
        /// Module title to attach the question to
        #[arg(long)]
        mooc_title: String,
        #[arg(long)]
        stem: String,
        #[arg(long, default_value = "medium")]
        difficulty: String,
        /// Option as LABEL:TEXT, repeat for every option
        #[arg(long = "option", value_parser = parse_option)]
        options: Vec<(String, String)>,
        /// Label of the correct option
        #[arg(long)]
        correct: String,
    },
}

fn parse_option(raw: &str) -> Result<(String, String), String> {
    let (label, text) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected LABEL:TEXT, got `{raw}`"))?;
    Ok((label.trim().to_uppercase(), text.trim().to_string()))
}

async fn id_by_title(mm: &ModelManager, table: &str, title: &str) -> AppResult<uuid::Uuid> {
    // table names come from this file only
    let query = format!("SELECT id FROM {table} WHERE title = $1 LIMIT 1");
    let id = sqlx::query_scalar(&query)
        .bind(title)
        .fetch_one(mm.executor())
        .await
        .map_err(DatabaseError::SqlxError)?;
    Ok(id)
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let _ = dotenvy::dotenv();
    let args = Cli::parse();

    let database_url = std::env::var("DATABASE_URL").map_err(|e| {
        AppError::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, e))
    })?;
    let mm = ModelManager::new(DbConnection::connect(&database_url)?);
    let actor = AuthenticatedUser::admin();

    match args.command {
        Commands::User { action } => match action {
            UserCommands::Add {
                username,
                password,
                full_name,
                role,
            } => {
                let user = UserEntity::create(
                    &mm,
                    &actor,
                    UserEntityCreateUpdate {
                        username,
                        full_name,
                        password_hash: mini_coursera::auth::hash_password(&password)?,
                    },
                )
                .await?;
                let user = user.set_role(&mm, &actor, UserRole::from(role.as_str())).await?;
                println!("User created: {} ({})", user.username(), user.id());
            }
        },

        Commands::Course { action } => match action {
            CourseCommands::Add {
                owner,
                title,
                description,
                level,
                price_cents,
                publish,
            } => {
                let owner = UserEntity::find_by_username(&mm, &actor, &owner)
                    .await?
                    .ok_or(DatabaseError::SqlxError(sqlx::Error::RowNotFound))?;
                let author = AuthenticatedUser::new(owner.id(), owner.role());

                let data = CourseCreate {
                    title,
                    description,
                    level,
                    price_cents,
                };
                if !data.is_valid() {
                    eprintln!("Course needs a title, a known level and a non-negative price");
                    std::process::exit(2);
                }

                let mut created = Course::create(&mm, &author, data).await?;
                if publish {
                    created = created.set_status(&mm, &actor, course::STATUS_ACTIVE).await?;
                }
                println!("Course created: {} ({})", created.title(), created.id());
            }
        },

        Commands::Mooc { action } => match action {
            MoocCommands::Add {
                course_title,
                title,
                order_index,
            } => {
                let course_id = id_by_title(&mm, "courses", &course_title).await?;
                let mooc = Mooc::create(
                    &mm,
                    MoocCreate {
                        course_id,
                        title,
                        order_index,
                    },
                )
                .await?;
                println!("Module created: {} ({})", mooc.title(), mooc.id());
            }
        },

        Commands::Lesson { action } => match action {
            LessonCommands::Add {
                mooc_title,
                title,
                file,
                order_index,
            } => {
                let mooc_id = id_by_title(&mm, "moocs", &mooc_title).await?;
                let content = std::fs::read_to_string(file)?;
                let lesson = Lesson::create(
                    &mm,
                    LessonCreate {
                        mooc_id,
                        title,
                        content,
                        order_index,
                    },
                )
                .await?;
                println!("Lesson created: {} ({})", lesson.title(), lesson.id());
            }
        },

        Commands::Question { action } => match action {
            QuestionCommands::Add {
                mooc_title,
                stem,
                difficulty,
                options,
                correct,
            } => {
                let mooc_id = id_by_title(&mm, "moocs", &mooc_title).await?;
                let correct = correct.trim().to_uppercase();
                let data = QuestionCreate {
                    stem,
                    qtype: None,
                    difficulty: Some(difficulty),
                    options: options
                        .into_iter()
                        .map(|(label, content)| QuestionOptionCreate {
                            is_correct: label == correct,
                            label,
                            content,
                        })
                        .collect(),
                };

                if let Err(e) = data.validate() {
                    eprintln!("Invalid question: {e}");
                    std::process::exit(2);
                }

                let (question, options) = Question::create_with_options(&mm, mooc_id, data).await?;
                println!(
                    "Question created: {} with {} options",
                    question.id(),
                    options.len()
                );
            }
        },
    }

    Ok(())
}
