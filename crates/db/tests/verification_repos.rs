//! Integration tests for the verification repositories.
//!
//! Exercises against a real database:
//! - Reference profiles are append-only and the newest one is active
//! - Image verifications persist verdict, confidence and distance
//! - Video jobs move from `processing` to `completed` / `failed`
//! - Frame verifications list in sampling order and cascade with their job

use faceverify_core::descriptor::FaceDescriptor;
use faceverify_core::verdict::Verdict;
use faceverify_db::models::frame_verification::CreateFrameVerification;
use faceverify_db::models::image_verification::CreateImageVerification;
use faceverify_db::models::reference_profile::CreateReferenceProfile;
use faceverify_db::models::video_job::{CreateVideoJob, VideoJobStatus};
use faceverify_db::repositories::{
    FrameVerificationRepo, ImageVerificationRepo, ReferenceProfileRepo, VideoJobRepo,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_profile(path: &str, values: &[f64]) -> CreateReferenceProfile {
    CreateReferenceProfile {
        image_path: path.to_string(),
        descriptor: FaceDescriptor::new(values.to_vec()).unwrap(),
    }
}

fn new_frame(video_job_id: i64, second: i32, verdict: Verdict) -> CreateFrameVerification {
    CreateFrameVerification {
        video_job_id,
        frame_path: format!("frames/video_{video_job_id}/frame_{second:06}.jpg"),
        second_offset: second,
        frame_index: i64::from(second) * 30,
        verdict,
        confidence: 0.0,
        distance: None,
    }
}

async fn new_job(pool: &PgPool) -> i64 {
    VideoJobRepo::create(
        pool,
        &CreateVideoJob {
            video_path: "videos/vid_test.mp4".to_string(),
            reference_profile_id: None,
        },
    )
    .await
    .unwrap()
    .id
}

// ---------------------------------------------------------------------------
// Test: no reference enrolled
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_find_active_empty(pool: PgPool) {
    let active = ReferenceProfileRepo::find_active(&pool).await.unwrap();
    assert!(active.is_none());
}

// ---------------------------------------------------------------------------
// Test: newest profile wins, older ones are kept
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_latest_profile_is_active(pool: PgPool) {
    let first = ReferenceProfileRepo::create(&pool, &new_profile("truth/truth_a.jpg", &[0.1, 0.2]))
        .await
        .unwrap();
    let second =
        ReferenceProfileRepo::create(&pool, &new_profile("truth/truth_b.jpg", &[0.3, 0.4]))
            .await
            .unwrap();

    let active = ReferenceProfileRepo::find_active(&pool)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(active.id, second.id);
    assert_eq!(active.image_path, "truth/truth_b.jpg");
    assert_eq!(active.descriptor().as_slice(), &[0.3, 0.4]);
    assert_eq!(active.dimension, 2);

    let history = ReferenceProfileRepo::list(&pool).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].id, first.id);
}

// ---------------------------------------------------------------------------
// Test: descriptor survives the JSONB round trip
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_descriptor_round_trip(pool: PgPool) {
    let values: Vec<f64> = (0..128).map(|i| i as f64 / 128.0 - 0.5).collect();
    let created = ReferenceProfileRepo::create(&pool, &new_profile("truth/t.jpg", &values))
        .await
        .unwrap();

    let loaded = ReferenceProfileRepo::find_by_id(&pool, created.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.descriptor().as_slice(), values.as_slice());
    assert_eq!(loaded.dimension, 128);
}

// ---------------------------------------------------------------------------
// Test: image verification persists all fields
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_image_verification(pool: PgPool) {
    let profile = ReferenceProfileRepo::create(&pool, &new_profile("truth/t.jpg", &[0.0]))
        .await
        .unwrap();

    let created = ImageVerificationRepo::create(
        &pool,
        &CreateImageVerification {
            image_path: "images/img_1.jpg".to_string(),
            verdict: Verdict::Match,
            confidence: 83.33,
            distance: Some(0.1),
            reference_profile_id: Some(profile.id),
        },
    )
    .await
    .unwrap();

    assert!(created.id > 0);
    assert_eq!(created.verdict().unwrap(), Verdict::Match);
    assert_eq!(created.confidence, 83.33);
    assert_eq!(created.distance, Some(0.1));
    assert_eq!(created.reference_profile_id, Some(profile.id));
}

// ---------------------------------------------------------------------------
// Test: image list is newest first
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_images_newest_first(pool: PgPool) {
    for name in ["a", "b", "c"] {
        ImageVerificationRepo::create(
            &pool,
            &CreateImageVerification {
                image_path: format!("images/img_{name}.jpg"),
                verdict: Verdict::NoTruth,
                confidence: 0.0,
                distance: None,
                reference_profile_id: None,
            },
        )
        .await
        .unwrap();
    }

    let list = ImageVerificationRepo::list(&pool).await.unwrap();
    let paths: Vec<&str> = list.iter().map(|r| r.image_path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["images/img_c.jpg", "images/img_b.jpg", "images/img_a.jpg"]
    );
}

// ---------------------------------------------------------------------------
// Test: confidence outside 0..=100 is rejected by the schema
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_confidence_out_of_range_rejected(pool: PgPool) {
    let result = ImageVerificationRepo::create(
        &pool,
        &CreateImageVerification {
            image_path: "images/img_x.jpg".to_string(),
            verdict: Verdict::Match,
            confidence: 150.0,
            distance: Some(0.0),
            reference_profile_id: None,
        },
    )
    .await;
    assert!(result.is_err());
}

// ---------------------------------------------------------------------------
// Test: video job lifecycle
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_video_job_completed(pool: PgPool) {
    let job_id = new_job(&pool).await;
    let job = VideoJobRepo::find_by_id(&pool, job_id).await.unwrap().unwrap();
    assert!(job.is_status(VideoJobStatus::Processing));
    assert_eq!(job.frame_count, 0);

    let done = VideoJobRepo::mark_completed(&pool, job_id, 10).await.unwrap();
    assert!(done.is_status(VideoJobStatus::Completed));
    assert_eq!(done.frame_count, 10);
    assert!(done.error_message.is_none());
    assert!(done.updated_at >= done.created_at);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_video_job_failed_keeps_frames(pool: PgPool) {
    let job_id = new_job(&pool).await;
    FrameVerificationRepo::create(&pool, &new_frame(job_id, 0, Verdict::NoFace))
        .await
        .unwrap();

    let failed = VideoJobRepo::mark_failed(&pool, job_id, 1, "disk full")
        .await
        .unwrap();
    assert!(failed.is_status(VideoJobStatus::Failed));
    assert_eq!(failed.error_message.as_deref(), Some("disk full"));
    assert_eq!(
        FrameVerificationRepo::count_by_job(&pool, job_id).await.unwrap(),
        1
    );
}

// ---------------------------------------------------------------------------
// Test: frames list in second order and are unique per second
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_frames_ordered_by_second(pool: PgPool) {
    let job_id = new_job(&pool).await;
    for second in [2, 0, 1] {
        FrameVerificationRepo::create(&pool, &new_frame(job_id, second, Verdict::NoMatch))
            .await
            .unwrap();
    }

    let frames = FrameVerificationRepo::list_by_job(&pool, job_id).await.unwrap();
    let seconds: Vec<i32> = frames.iter().map(|f| f.second_offset).collect();
    assert_eq!(seconds, vec![0, 1, 2]);
    assert_eq!(frames[1].frame_index, 30);
    assert_eq!(frames[0].verdict().unwrap(), Verdict::NoMatch);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_second_rejected(pool: PgPool) {
    let job_id = new_job(&pool).await;
    FrameVerificationRepo::create(&pool, &new_frame(job_id, 0, Verdict::Match))
        .await
        .unwrap();

    let dup = FrameVerificationRepo::create(&pool, &new_frame(job_id, 0, Verdict::Match)).await;
    assert!(dup.is_err());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_frames_cascade_with_job(pool: PgPool) {
    let job_id = new_job(&pool).await;
    FrameVerificationRepo::create(&pool, &new_frame(job_id, 0, Verdict::Match))
        .await
        .unwrap();

    sqlx::query("DELETE FROM video_jobs WHERE id = $1")
        .bind(job_id)
        .execute(&pool)
        .await
        .unwrap();

    assert_eq!(
        FrameVerificationRepo::count_by_job(&pool, job_id).await.unwrap(),
        0
    );
}
