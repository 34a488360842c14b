use std::marker::PhantomData;

#[derive(Clone)]
pub(super) struct ProstCodec<E, D> {
    _marker: PhantomData<fn(E) -> D>,
}

impl<E, D> Default for ProstCodec<E, D> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<E, D> tonic::codec::Codec for ProstCodec<E, D>
where
    E: prost::Message + Send + 'static,
    D: prost::Message + Default + Send + 'static,
{
    type Encode = E;
    type Decode = D;
    type Encoder = ProstEncoder<E>;
    type Decoder = ProstDecoder<D>;

    fn encoder(&mut self) -> Self::Encoder {
        ProstEncoder(PhantomData)
    }

    fn decoder(&mut self) -> Self::Decoder {
        ProstDecoder(PhantomData)
    }
}

#[derive(Clone)]
pub(super) struct ProstEncoder<E>(PhantomData<fn(E)>);

impl<E> tonic::codec::Encoder for ProstEncoder<E>
where
    E: prost::Message + Send + 'static,
{
    type Item = E;
    type Error = tonic::Status;

    fn encode(
        &mut self,
        item: Self::Item,
        dst: &mut tonic::codec::EncodeBuf<'_>,
    ) -> std::result::Result<(), Self::Error> {
        item.encode(dst)
            .map_err(|e| tonic::Status::internal(e.to_string()))?;
        Ok(())
    }
}

#[derive(Clone)]
pub(super) struct ProstDecoder<D>(PhantomData<fn() -> D>);

impl<D> tonic::codec::Decoder for ProstDecoder<D>
where
    D: prost::Message + Default + Send + 'static,
{
    type Item = D;
    type Error = tonic::Status;

    fn decode(
        &mut self,
        src: &mut tonic::codec::DecodeBuf<'_>,
    ) -> std::result::Result<Option<Self::Item>, Self::Error> {
        // proto3 messages with all-default fields encode to zero bytes, so an empty
        // frame is still a valid message.
        let msg = D::decode(&mut *src).map_err(|e| tonic::Status::internal(e.to_string()))?;
        Ok(Some(msg))
    }
}
