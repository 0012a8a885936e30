use chrono::Duration;
use quiz_core::model::{
    Answer, AnswerId, NewExamResult, Question, QuestionId, ScoreReport, UserId, UserProfile,
    UserRole,
};
use quiz_core::time::fixed_now;
use storage::repository::{
    ExamResultRepository, QuestionRepository, Storage, StorageError, UserRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_question(id: u64, topic: Option<&str>, answers: &[(u64, bool)]) -> Question {
    Question::new(
        QuestionId::new(id),
        format!("Question {id}"),
        topic.map(str::to_owned),
        answers
            .iter()
            .map(|(answer, correct)| Answer::new(AnswerId::new(*answer), format!("A{answer}"), *correct))
            .collect(),
    )
    .unwrap()
}

fn profile(id: u64, role: UserRole) -> UserProfile {
    UserProfile {
        user_id: UserId::new(id),
        name: format!("User {id}"),
        role,
        created_at: fixed_now(),
    }
}

fn result_for(student: u64, correct: u32, total: u32, minutes: i64) -> NewExamResult {
    NewExamResult::from_report(
        UserId::new(student),
        "Operating Systems Quiz",
        &ScoreReport::new(correct, total).unwrap(),
        fixed_now() + Duration::minutes(minutes),
    )
    .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrips_questions_with_answer_order() {
    let repo = connect("memdb_questions").await;

    let first = build_question(1, Some("CPU Scheduling"), &[(12, false), (10, true), (11, false)]);
    let second = build_question(2, None, &[(20, true), (21, false)]);
    repo.upsert_question(&second).await.unwrap();
    repo.upsert_question(&first).await.unwrap();

    let listed = repo.list_questions().await.unwrap();
    assert_eq!(listed, vec![first.clone(), second.clone()]);
    assert_eq!(listed[1].topic_key(), "General");

    let answer_ids: Vec<_> = listed[0].answers().iter().map(|a| a.id.value()).collect();
    assert_eq!(answer_ids, vec![12, 10, 11]);
    assert_eq!(listed[0].correct_answer_id(), AnswerId::new(10));
}

#[tokio::test]
async fn sqlite_upsert_replaces_answers_and_delete_cascades() {
    let repo = connect("memdb_question_replace").await;

    repo.upsert_question(&build_question(1, Some("Memory"), &[(1, true), (2, false), (3, false)]))
        .await
        .unwrap();
    let edited = build_question(1, Some("Paging"), &[(4, true), (5, false)]);
    repo.upsert_question(&edited).await.unwrap();

    let fetched = repo.get_question(QuestionId::new(1)).await.unwrap().unwrap();
    assert_eq!(fetched, edited);

    repo.delete_question(QuestionId::new(1)).await.unwrap();
    assert!(repo.get_question(QuestionId::new(1)).await.unwrap().is_none());
    assert!(matches!(
        repo.delete_question(QuestionId::new(1)).await,
        Err(StorageError::NotFound)
    ));

    let orphaned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM answers")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(orphaned, 0);
}

#[tokio::test]
async fn sqlite_rejects_invalid_persisted_question() {
    let repo = connect("memdb_invalid_question").await;

    sqlx::query("INSERT INTO questions (id, text, topic) VALUES (1, 'Broken', NULL)")
        .execute(repo.pool())
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO answers (id, question_id, position, text, is_correct) VALUES (1, 1, 0, 'a', 0), (2, 1, 1, 'b', 0)",
    )
    .execute(repo.pool())
    .await
    .unwrap();

    assert!(matches!(
        repo.list_questions().await,
        Err(StorageError::Serialization(_))
    ));
}

#[tokio::test]
async fn sqlite_lists_results_newest_first() {
    let repo = connect("memdb_results").await;
    repo.upsert_user(&profile(1, UserRole::Student)).await.unwrap();
    repo.upsert_user(&profile(2, UserRole::Student)).await.unwrap();

    let older = repo.append_result(&result_for(1, 1, 3, 0)).await.unwrap();
    let newer = repo.append_result(&result_for(1, 3, 3, 30)).await.unwrap();
    repo.append_result(&result_for(2, 2, 3, 15)).await.unwrap();

    let mine = repo
        .list_results_for_student(UserId::new(1), 10)
        .await
        .unwrap();
    let ids: Vec<_> = mine.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec![newer, older]);
    assert_eq!(mine[0].score(), 3);
    assert_eq!(mine[0].max_score(), 3);
    assert_eq!(mine[0].exam_title(), "Operating Systems Quiz");

    let recent = repo.list_recent_results(2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id(), newer);
    assert_eq!(recent[1].student_id(), UserId::new(2));

    let fetched = repo.get_result(older).await.unwrap().unwrap();
    assert_eq!(fetched.created_at(), fixed_now());
}

#[tokio::test]
async fn sqlite_result_for_unknown_student_conflicts() {
    let repo = connect("memdb_result_fk").await;
    assert!(matches!(
        repo.append_result(&result_for(42, 1, 1, 0)).await,
        Err(StorageError::Conflict)
    ));
}

#[tokio::test]
async fn sqlite_users_filter_by_role() {
    let repo = connect("memdb_users").await;
    repo.upsert_user(&profile(1, UserRole::Professor)).await.unwrap();
    repo.upsert_user(&profile(3, UserRole::Student)).await.unwrap();
    repo.upsert_user(&profile(2, UserRole::Student)).await.unwrap();

    let students = repo.list_users(Some(UserRole::Student)).await.unwrap();
    let ids: Vec<_> = students.iter().map(|u| u.user_id.value()).collect();
    assert_eq!(ids, vec![2, 3]);

    let professor = repo.get_user(UserId::new(1)).await.unwrap().unwrap();
    assert_eq!(professor.role, UserRole::Professor);
    assert_eq!(repo.list_users(None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn storage_sqlite_wires_all_repositories() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage?mode=memory&cache=shared")
        .await
        .expect("storage");

    storage
        .users
        .upsert_user(&profile(7, UserRole::Student))
        .await
        .unwrap();
    storage
        .questions
        .upsert_question(&build_question(1, None, &[(1, true), (2, false)]))
        .await
        .unwrap();
    let id = storage
        .results
        .append_result(&result_for(7, 1, 1, 0))
        .await
        .unwrap();

    assert_eq!(storage.questions.list_questions().await.unwrap().len(), 1);
    assert!(storage.results.get_result(id).await.unwrap().is_some());
}

#[tokio::test]
async fn sqlite_user_names_are_unique() {
    let repo = connect("memdb_user_names").await;
    repo.upsert_user(&profile(1, UserRole::Professor)).await.unwrap();

    let clash = UserProfile {
        name: "User 1".into(),
        ..profile(2, UserRole::Student)
    };
    assert!(matches!(repo.upsert_user(&clash).await, Err(StorageError::Conflict)));
    assert!(matches!(
        repo.create_user("User 1", UserRole::Student, fixed_now()).await,
        Err(StorageError::Conflict)
    ));

    let created = repo
        .create_user("Lucia", UserRole::Student, fixed_now())
        .await
        .unwrap();
    assert_eq!(created.user_id, UserId::new(2));
    assert_eq!(repo.get_user(created.user_id).await.unwrap(), Some(created.clone()));
    assert!(matches!(
        repo.update_user(created.user_id, "User 1", UserRole::Student).await,
        Err(StorageError::Conflict)
    ));
}

#[tokio::test]
async fn sqlite_update_user_requires_existing_row() {
    let repo = connect("memdb_user_update").await;
    repo.upsert_user(&profile(4, UserRole::Student)).await.unwrap();

    let updated = repo
        .update_user(UserId::new(4), "Marta", UserRole::Student)
        .await
        .unwrap();
    assert_eq!(updated.name, "Marta");
    assert_eq!(updated.created_at, fixed_now());
    assert!(matches!(
        repo.update_user(UserId::new(5), "Nobody", UserRole::Student).await,
        Err(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn sqlite_delete_user_cascades_to_results() {
    let repo = connect("memdb_user_delete").await;
    repo.upsert_user(&profile(1, UserRole::Student)).await.unwrap();
    repo.upsert_user(&profile(2, UserRole::Student)).await.unwrap();
    let gone = repo.append_result(&result_for(1, 1, 2, 0)).await.unwrap();
    repo.append_result(&result_for(2, 2, 2, 5)).await.unwrap();

    repo.delete_user(UserId::new(1)).await.unwrap();

    assert!(repo.get_user(UserId::new(1)).await.unwrap().is_none());
    assert!(repo.get_result(gone).await.unwrap().is_none());
    assert_eq!(repo.list_recent_results(10).await.unwrap().len(), 1);
    assert!(matches!(
        repo.delete_user(UserId::new(1)).await,
        Err(StorageError::NotFound)
    ));
}
