//! Integration tests for `acquire_release`/`acquire_use_release` against real
//! file I/O: the bracket pattern has to hold up against genuine async I/O,
//! not just in-memory stand-ins.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use micro_effect::prelude::*;

fn temp_file_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("micro_effect_bracket_test_{name}.txt"))
}

#[tokio::test]
async fn acquire_use_release_cleans_up_temp_file_on_success() {
    let path = temp_file_path("success");
    let path_for_acquire = path.clone();
    let path_for_release = path.clone();
    let cleanup_ran = Arc::new(AtomicBool::new(false));
    let cleanup_ran_for_release = cleanup_ran.clone();

    let result = acquire_use_release(
        sync::<_, PathBuf, std::io::Error>(move || {
            std::fs::write(&path_for_acquire, "test content").unwrap();
            path_for_acquire.clone()
        }),
        |p: Arc<PathBuf>| {
            sync::<_, String, std::io::Error>(move || std::fs::read_to_string(&*p).unwrap())
        },
        move |_p, _use_result| {
            let cleanup_ran = cleanup_ran_for_release.clone();
            let path = path_for_release.clone();
            sync::<_, (), std::io::Error>(move || {
                cleanup_ran.store(true, Ordering::SeqCst);
                let _ = std::fs::remove_file(&path);
            })
        },
    )
    .run(&Env::root())
    .await;

    assert_eq!(result, Ok("test content".to_string()));
    assert!(cleanup_ran.load(Ordering::SeqCst), "cleanup should have run");
    assert!(!path.exists(), "temp file should be deleted");
}

#[tokio::test]
async fn acquire_use_release_cleans_up_temp_file_on_use_failure() {
    let path = temp_file_path("use_failure");
    let path_for_acquire = path.clone();
    let path_for_release = path.clone();
    let cleanup_ran = Arc::new(AtomicBool::new(false));
    let cleanup_ran_for_release = cleanup_ran.clone();

    let result = acquire_use_release(
        sync::<_, PathBuf, &'static str>(move || {
            std::fs::write(&path_for_acquire, "test content").unwrap();
            path_for_acquire.clone()
        }),
        |_p: Arc<PathBuf>| fail::<(), &'static str>("use failed"),
        move |_p, _use_result| {
            let cleanup_ran = cleanup_ran_for_release.clone();
            let path = path_for_release.clone();
            sync::<_, (), &'static str>(move || {
                cleanup_ran.store(true, Ordering::SeqCst);
                let _ = std::fs::remove_file(&path);
            })
        },
    )
    .run(&Env::root())
    .await;

    assert_eq!(result, Err(Failure::Expected("use failed")));
    assert!(cleanup_ran.load(Ordering::SeqCst), "cleanup must run on use failure");
    assert!(!path.exists(), "temp file should be deleted despite failure");
}

#[tokio::test]
async fn acquire_release_runs_in_lifo_order_when_scope_closes() {
    let path1 = temp_file_path("lifo1");
    let path2 = temp_file_path("lifo2");
    let path1_for_acquire = path1.clone();
    let path2_for_acquire = path2.clone();
    let path1_for_release = path1.clone();
    let path2_for_release = path2.clone();

    let order = Arc::new(std::sync::Mutex::new(Vec::<&'static str>::new()));
    let order1 = order.clone();
    let order2 = order.clone();

    let result = scoped(
        acquire_release(
            sync::<_, PathBuf, &'static str>(move || {
                std::fs::write(&path1_for_acquire, "file 1").unwrap();
                path1_for_acquire.clone()
            }),
            move |p, _exit| {
                let order = order1.clone();
                let path = path1_for_release.clone();
                sync::<_, (), &'static str>(move || {
                    order.lock().unwrap().push("file1");
                    assert_eq!(*p, path);
                    let _ = std::fs::remove_file(&path);
                })
            },
        )
        .and_then(move |p1| {
            let p2_acquire = path2_for_acquire.clone();
            let order2 = order2.clone();
            let path2_for_release = path2_for_release.clone();
            acquire_release(
                sync::<_, PathBuf, &'static str>(move || {
                    std::fs::write(&p2_acquire, "file 2").unwrap();
                    p2_acquire.clone()
                }),
                move |_p, _exit| {
                    let order = order2.clone();
                    let path = path2_for_release.clone();
                    sync::<_, (), &'static str>(move || {
                        order.lock().unwrap().push("file2");
                        let _ = std::fs::remove_file(&path);
                    })
                },
            )
            .map(move |p2| (p1.clone(), p2))
        }),
    )
    .run(&Env::root())
    .await;

    assert!(result.is_ok());
    assert_eq!(*order.lock().unwrap(), vec!["file2", "file1"], "cleanup should be LIFO");
    assert!(!path1.exists());
    assert!(!path2.exists());
}

#[tokio::test]
async fn acquire_release_does_not_run_when_acquire_fails() {
    let cleanup_ran = Arc::new(AtomicBool::new(false));
    let cleanup_ran_for_release = cleanup_ran.clone();

    let result = scoped(acquire_release(
        fail::<PathBuf, &'static str>("acquire failed"),
        move |_p: Arc<PathBuf>, _exit| {
            let cleanup_ran = cleanup_ran_for_release.clone();
            sync::<_, (), &'static str>(move || {
                cleanup_ran.store(true, Ordering::SeqCst);
            })
        },
    ))
    .run(&Env::root())
    .await;

    assert_eq!(result, Err(Failure::Expected("acquire failed")));
    assert!(!cleanup_ran.load(Ordering::SeqCst), "cleanup must NOT run when acquire fails");
}

/// Bridges a tokio future into an effect by spawning it and resuming through
/// the [`async_effect`] callback, the way a host I/O primitive would.
fn from_tokio_future<Fut, A>(fut: Fut) -> impl MicroEffect<Output = A, Error = std::io::Error>
where
    Fut: std::future::Future<Output = std::io::Result<A>> + Send + 'static,
    A: Send + 'static,
{
    async_effect(move |resume, _signal| {
        tokio::spawn(async move {
            resume.resume(fut.await.map_err(Failure::Expected));
        });
        None
    })
}

#[tokio::test]
async fn acquire_use_release_works_with_tokio_async_file_operations() {
    let path = temp_file_path("tokio_async");
    let path_for_acquire = path.clone();
    let path_for_use = path.clone();
    let path_for_release = path.clone();
    let cleanup_ran = Arc::new(AtomicBool::new(false));
    let cleanup_ran_for_release = cleanup_ran.clone();

    let result = acquire_use_release(
        from_tokio_future(async move {
            tokio::fs::write(&path_for_acquire, "async test content").await?;
            Ok(path_for_acquire)
        }),
        move |p: Arc<PathBuf>| {
            let path = path_for_use.clone();
            from_tokio_future(async move {
                assert_eq!(*p, path);
                tokio::fs::read_to_string(&*p).await
            })
        },
        move |p, _use_result| {
            let cleanup_ran = cleanup_ran_for_release.clone();
            let path = path_for_release.clone();
            from_tokio_future(async move {
                cleanup_ran.store(true, Ordering::SeqCst);
                assert_eq!(*p, path);
                tokio::fs::remove_file(&*p).await
            })
        },
    )
    .run(&Env::root())
    .await;

    assert_eq!(result, Ok("async test content".to_string()));
    assert!(cleanup_ran.load(Ordering::SeqCst));
    assert!(!path.exists(), "file should be deleted by async cleanup");
}
