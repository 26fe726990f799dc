use mousebox_decoder::{Backend, Configuration, FrameStreamProvider};
use tokio_stream::StreamExt;

#[tokio::test(flavor = "multi_thread")]
async fn mock_backend_produces_stream() {
    let config = Configuration {
        backend: Backend::Mock,
        ..Configuration::default()
    };
    let provider = config.create_provider().expect("mock backend available");
    let metadata = provider.metadata();
    assert_eq!(metadata.fps, Some(30.0));

    let mut stream = provider.into_stream();
    let mut frames = Vec::new();
    while let Some(frame) = stream.next().await {
        frames.push(frame.unwrap());
        if frames.len() == 3 {
            break;
        }
    }
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[0].width(), 320);
}
